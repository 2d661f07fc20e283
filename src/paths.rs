use std::path::{Path, PathBuf};

use crate::error::MacpineError;

/// On-disk layout rooted at `<home>/.macpine`.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Layout under the current user's home directory.
    pub fn from_home() -> Result<Self, MacpineError> {
        let home = dirs::home_dir().ok_or(MacpineError::HomeDirNotFound)?;
        Ok(Self::new(home))
    }

    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            root: home.into().join(".macpine"),
        }
    }

    /// `~/.macpine/`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Base image cache: `~/.macpine/cache/`
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Logs of failed launches: `~/.macpine/cache/.error-logs/`
    pub fn error_logs_dir(&self) -> PathBuf {
        self.cache_dir().join(".error-logs")
    }

    /// Per-instance directory: `~/.macpine/<alias>/`
    pub fn instance_dir(&self, alias: &str) -> PathBuf {
        self.root.join(alias)
    }

    pub fn config_path(&self, alias: &str) -> PathBuf {
        self.instance_dir(alias).join("config.yaml")
    }
}

/// Engine log inside an instance directory.
pub fn log_path(location: &Path) -> PathBuf {
    location.join("alpine.log")
}

/// QEMU pid file inside an instance directory.
pub fn pid_path(location: &Path) -> PathBuf {
    location.join("alpine.pid")
}

/// Cloud-init NoCloud seed directory inside an instance directory.
pub fn seed_dir(location: &Path) -> PathBuf {
    location.join("seed")
}

/// Root disk overlay inside an instance directory.
pub fn disk_path(location: &Path) -> PathBuf {
    location.join("disk.qcow2")
}
