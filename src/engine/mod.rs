pub mod qemu;

use crate::config::InstanceConfig;
use crate::error::MacpineError;
use crate::paths::Paths;

/// The virtualization engine that actually boots an instance.
///
/// `start` may leave a partially created instance directory, a log file
/// and even a running process behind when it fails.
#[allow(async_fn_in_trait)] // trait is internal-only
pub trait Engine {
    async fn start(&self, config: &InstanceConfig) -> Result<(), MacpineError>;
}

pub fn create_engine(paths: &Paths) -> qemu::QemuEngine {
    qemu::QemuEngine::new(paths.clone())
}
