use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::config::{self, InstanceConfig};
use crate::error::MacpineError;
use crate::paths::{self, Paths};
use crate::validate::Arch;

/// Boots instances with `qemu-system-*`, daemonized, from a qcow2 overlay
/// over a cached Alpine cloud image.
pub struct QemuEngine {
    paths: Paths,
}

impl QemuEngine {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }
}

impl super::Engine for QemuEngine {
    async fn start(&self, config: &InstanceConfig) -> Result<(), MacpineError> {
        let location = PathBuf::from(&config.location);
        tokio::fs::create_dir_all(&location)
            .await
            .map_err(|e| MacpineError::io(format!("creating {}", location.display()), e))?;

        config::save(&self.paths.config_path(&config.alias), config)?;

        let log_path = paths::log_path(&location);
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| MacpineError::io(format!("opening {}", log_path.display()), e))?;

        let result = self.boot(config, &location, &log).await;
        if let Err(ref e) = result {
            record_failure(&mut log, &log_path, e);
        }
        result
    }
}

impl QemuEngine {
    async fn boot(
        &self,
        config: &InstanceConfig,
        location: &Path,
        log: &File,
    ) -> Result<(), MacpineError> {
        let base = self.paths.cache_dir().join(&config.image);
        if !base.is_file() {
            return Err(MacpineError::Engine {
                message: format!("base image {} not found", base.display()),
            });
        }

        let disk = paths::disk_path(location);
        create_overlay(&base, &disk, &config.disk.to_string()).await?;
        stage_seed(config, location).await?;

        let binary = format!("qemu-system-{}", config.arch);
        let args = qemu_args(config, location);
        tracing::debug!(binary = %binary, ?args, "starting qemu");

        let stdout = log
            .try_clone()
            .map_err(|e| MacpineError::io("duplicating log handle", e))?;
        let stderr = log
            .try_clone()
            .map_err(|e| MacpineError::io("duplicating log handle", e))?;

        let status = tokio::process::Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .await
            .map_err(|e| MacpineError::Engine {
                message: format!("failed to run {binary}: {e}"),
            })?;

        if !status.success() {
            return Err(MacpineError::Engine {
                message: format!("{binary} exited with {status}"),
            });
        }

        tracing::info!(alias = %config.alias, "qemu started");
        Ok(())
    }
}

/// Append the engine error to the instance log. Returns whether it landed.
fn record_failure(log: &mut impl Write, log_path: &Path, err: &MacpineError) -> bool {
    match writeln!(log, "macpine: {err}") {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                path = %log_path.display(),
                error = %err,
                "could not record launch error in log: {e}"
            );
            false
        }
    }
}

/// Create a qcow2 overlay of `size` backed by the given base image.
async fn create_overlay(base: &Path, disk: &Path, size: &str) -> Result<(), MacpineError> {
    let output = tokio::process::Command::new("qemu-img")
        .args(["create", "-f", "qcow2", "-b"])
        .arg(base)
        .args(["-F", "qcow2"])
        .arg(disk)
        .arg(size)
        .output()
        .await
        .map_err(|e| MacpineError::Engine {
            message: format!("failed to run qemu-img: {e}"),
        })?;

    if !output.status.success() {
        return Err(MacpineError::Engine {
            message: format!(
                "qemu-img failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    tracing::debug!(path = %disk.display(), "created qcow2 overlay");
    Ok(())
}

/// Lay out a NoCloud seed directory (`user-data` + `meta-data`).
async fn stage_seed(config: &InstanceConfig, location: &Path) -> Result<(), MacpineError> {
    let seed = paths::seed_dir(location);
    tokio::fs::create_dir_all(&seed)
        .await
        .map_err(|e| MacpineError::io(format!("creating {}", seed.display()), e))?;

    tokio::fs::copy(&config.cloud_init, seed.join("user-data"))
        .await
        .map_err(|e| MacpineError::io(format!("copying {}", config.cloud_init), e))?;

    let hostname = &config.alias;
    let meta_data = format!("instance-id: {hostname}\nlocal-hostname: {hostname}\n");
    tokio::fs::write(seed.join("meta-data"), meta_data)
        .await
        .map_err(|e| MacpineError::io(format!("writing meta-data in {}", seed.display()), e))?;
    Ok(())
}

/// Command line for `qemu-system-<arch>`.
pub fn qemu_args(config: &InstanceConfig, location: &Path) -> Vec<String> {
    let native = Arch::host().is_some_and(|h| h.as_str() == config.arch);
    let accel = match (native, cfg!(target_os = "macos")) {
        (true, true) => "hvf",
        (true, false) => "kvm",
        (false, _) => "tcg",
    };
    let (machine, cpu) = match (config.arch.as_str(), native) {
        ("aarch64", true) => ("virt", "host"),
        ("aarch64", false) => ("virt", "cortex-a72"),
        (_, true) => ("q35", "host"),
        (_, false) => ("q35", "max"),
    };

    let mut args: Vec<String> = vec![
        "-name".into(),
        config.alias.clone(),
        "-machine".into(),
        machine.into(),
        "-accel".into(),
        accel.into(),
        "-cpu".into(),
        cpu.into(),
        "-smp".into(),
        config.cpu.to_string(),
        "-m".into(),
        config.memory.to_string(),
    ];

    if config.firmware == "uefi" {
        args.extend(["-bios".to_string(), "edk2-aarch64-code.fd".to_string()]);
    }

    let disk = paths::disk_path(location);
    let seed = paths::seed_dir(location);
    args.extend([
        "-drive".into(),
        format!("if=virtio,format=qcow2,file={}", disk.display()),
        "-drive".into(),
        format!(
            "if=virtio,format=raw,readonly=on,file.driver=vvfat,file.dir={},file.label=cidata",
            seed.display()
        ),
    ]);

    let netdev = if config.vmnet {
        "vmnet-shared,id=net0".to_string()
    } else {
        let mut rules = vec![format!("hostfwd=tcp::{}-:22", config.ssh_port)];
        rules.extend(config.ports.iter().map(|p| p.hostfwd()));
        format!("user,id=net0,{}", rules.join(","))
    };
    args.extend([
        "-netdev".into(),
        netdev,
        "-device".into(),
        format!("virtio-net-pci,netdev=net0,mac={}", config.mac_address),
    ]);

    if let Some(ref mount) = config.mount {
        args.extend([
            "-virtfs".into(),
            format!("local,path={mount},mount_tag=host0,security_model=mapped-xattr,id=host0"),
        ]);
    }

    args.extend([
        "-display".into(),
        "none".into(),
        "-serial".into(),
        format!("file:{}", location.join("serial.log").display()),
        "-daemonize".into(),
        "-pidfile".into(),
        paths::pid_path(location).display().to_string(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::engine::Engine;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn args_carry_resources_and_identity() {
        let home = tempfile::tempdir().unwrap();
        let config = test_config(home.path(), "web");
        let location = PathBuf::from(&config.location);
        let args = qemu_args(&config, &location);

        assert_eq!(arg_after(&args, "-name"), ["web"]);
        assert_eq!(arg_after(&args, "-smp"), ["2"]);
        assert_eq!(arg_after(&args, "-m"), ["2048"]);
        let netdev = arg_after(&args, "-netdev")[0];
        assert!(netdev.contains("hostfwd=tcp::22-:22"));
        assert!(netdev.contains("hostfwd=tcp::8080-:80"));
        let device = arg_after(&args, "-device")[0];
        assert!(device.ends_with("mac=52:54:00:12:34:56"));
        assert!(args.iter().any(|a| a == "-daemonize"));
        assert_eq!(
            arg_after(&args, "-pidfile"),
            [paths::pid_path(&location).display().to_string()]
        );
        assert!(arg_after(&args, "-bios").is_empty());
        assert!(arg_after(&args, "-virtfs").is_empty());
    }

    #[test]
    fn args_vmnet_and_mount() {
        let home = tempfile::tempdir().unwrap();
        let mut config = test_config(home.path(), "web");
        config.vmnet = true;
        config.mount = Some("/srv/share".into());
        config.firmware = "uefi".into();
        let args = qemu_args(&config, Path::new(&config.location));

        assert_eq!(arg_after(&args, "-netdev"), ["vmnet-shared,id=net0"]);
        assert!(arg_after(&args, "-virtfs")[0].contains("path=/srv/share"));
        assert_eq!(arg_after(&args, "-bios"), ["edk2-aarch64-code.fd"]);
    }

    struct BrokenLog;

    impl Write for BrokenLog {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_log_write_is_reported() {
        let err = MacpineError::Engine {
            message: "boom".into(),
        };
        let path = Path::new("/tmp/web/alpine.log");

        assert!(!record_failure(&mut BrokenLog, path, &err));

        let mut buf = Vec::new();
        assert!(record_failure(&mut buf, path, &err));
        assert_eq!(String::from_utf8(buf).unwrap(), "macpine: boom\n");
    }

    #[tokio::test]
    async fn missing_base_image_is_logged() {
        let home = tempfile::tempdir().unwrap();
        let paths = Paths::new(home.path());
        let config = test_config(home.path(), "web");

        let engine = QemuEngine::new(paths.clone());
        let err = engine.start(&config).await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        // directory, config and log are left behind for inspection
        let location = paths.instance_dir("web");
        assert!(paths.config_path("web").is_file());
        let log = std::fs::read_to_string(paths::log_path(&location)).unwrap();
        assert!(log.contains("not found"));
    }
}
