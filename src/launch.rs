//! Launch pipeline and failed-launch recovery.
//!
//! `launch_cloud` runs validate → identity → build → start. When the engine
//! fails, the instance directory and any spawned process are left alone;
//! the operator gets the relocated log plus cleanup and kill commands.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{self, Identity, InstanceConfig, LaunchOptions};
use crate::engine::Engine;
use crate::error::MacpineError;
use crate::paths::{self, Paths};
use crate::validate::{self, LaunchArgs};
use crate::{host, identity, util};

/// Everything `launch-cloud` was invoked with.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub args: LaunchArgs,
    pub image: String,
    pub name: String,
    pub cloud_init: PathBuf,
    pub vmnet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    Launching,
    Launched,
    FailedWithRecovery,
}

/// What the operator needs to clean up after a failed launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Where the engine log was moved to, if the move worked.
    pub log_path: Option<PathBuf>,
    pub location: PathBuf,
    pub pid: Option<u32>,
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref log) = self.log_path {
            writeln!(f, "logs are in: {}", log.display())?;
        }
        writeln!(f, "run this to clean up:")?;
        write!(f, "rm -rf {}", self.location.display())?;
        if let Some(pid) = self.pid {
            write!(f, "\nkill {pid}")?;
        }
        Ok(())
    }
}

/// Validate the request, create the instance identity and config, and start it.
pub async fn launch_cloud<E: Engine>(
    request: &LaunchRequest,
    paths: &Paths,
    engine: &E,
) -> Result<InstanceConfig, MacpineError> {
    let params = validate::validate(&request.args)?;
    if !request.cloud_init.is_file() {
        return Err(MacpineError::validation(
            "cloud-init",
            format!("cloud-init file {} does not exist", request.cloud_init.display()),
        ));
    }
    let cloud_init = request.cloud_init.canonicalize().map_err(|e| {
        MacpineError::io(format!("resolving {}", request.cloud_init.display()), e)
    })?;

    validate::validate_name(&request.name)?;
    let existing = host::list_instance_names(paths)?;
    let identity = Identity {
        alias: identity::resolve_alias(&request.name, &existing)?,
        mac_address: identity::generate_mac_address(),
    };

    let options = LaunchOptions {
        image: &request.image,
        cloud_init: &cloud_init,
        vmnet: request.vmnet,
    };
    let config = config::build(&params, identity, &options, paths);

    launch(engine, paths, &config).await?;
    Ok(config)
}

/// Start `config` on `engine`, running recovery if the start fails.
pub async fn launch<E: Engine>(
    engine: &E,
    paths: &Paths,
    config: &InstanceConfig,
) -> Result<LaunchState, MacpineError> {
    let mut state = LaunchState::Idle;
    transition(&mut state, LaunchState::Launching, &config.alias);

    match engine.start(config).await {
        Ok(()) => {
            transition(&mut state, LaunchState::Launched, &config.alias);
            tracing::info!(alias = %config.alias, "instance launched");
            Ok(state)
        }
        Err(cause) => {
            let report = recover(paths, config);
            println!("{report}");
            transition(&mut state, LaunchState::FailedWithRecovery, &config.alias);
            Err(MacpineError::Launch {
                alias: config.alias.clone(),
                source: Box::new(cause),
            })
        }
    }
}

fn transition(state: &mut LaunchState, next: LaunchState, alias: &str) {
    tracing::debug!(alias, from = ?*state, to = ?next, "launch state");
    *state = next;
}

/// Move the engine log into the error-log directory and collect the manual
/// cleanup details. Never deletes anything and never signals the process.
pub fn recover(paths: &Paths, config: &InstanceConfig) -> RecoveryReport {
    let location = PathBuf::from(&config.location);
    let dest = paths
        .error_logs_dir()
        .join(error_log_name(&config.alias, &util::utc_timestamp()));

    let log_path = match relocate_log(&paths::log_path(&location), &dest) {
        Ok(()) => Some(dest),
        Err(e) => {
            tracing::warn!(alias = %config.alias, "could not keep launch log: {e}");
            None
        }
    };

    RecoveryReport {
        log_path,
        pid: host::instance_pid(&location),
        location,
    }
}

/// `<alias, spaces as underscores>_<timestamp>.log`
pub fn error_log_name(alias: &str, timestamp: &str) -> String {
    format!("{}_{timestamp}.log", alias.replace(' ', "_"))
}

fn relocate_log(from: &Path, to: &Path) -> Result<(), MacpineError> {
    if let Some(dir) = to.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| MacpineError::io(format!("creating {}", dir.display()), e))?;
    }
    std::fs::rename(from, to).map_err(|e| {
        MacpineError::io(
            format!("moving {} to {}", from.display(), to.display()),
            e,
        )
    })
}
