use std::path::Path;

use facet::Facet;

use crate::error::MacpineError;
use crate::paths::Paths;
use crate::ports::PortForward;
use crate::validate::{DiskSize, LaunchParams};

pub const DEFAULT_IMAGE: &str = "alpine_3.20.3";

const SSH_USER: &str = "alpine";
const SSH_PASSWORD: &str = "raw::root";
const ROOT_USERNAME: &str = "alpine";
const ROOT_PASSWORD: &str = "root";
const MACHINE_IP: &str = "localhost";

/// Persisted record for one instance, stored as `config.yaml` in its directory.
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct InstanceConfig {
    pub alias: String,
    pub image: String,
    pub arch: String,
    pub cpu: u32,
    pub memory: u32,
    pub disk: DiskSize,
    #[facet(default)]
    pub ports: Vec<PortForward>,
    pub mount: Option<String>,
    pub ssh_port: u16,
    pub mac_address: String,
    pub machine_ip: String,
    #[facet(default)]
    pub vmnet: bool,
    pub firmware: String,
    pub ssh_user: String,
    pub ssh_password: String,
    pub root_username: String,
    pub root_password: String,
    pub cloud_init: String,
    pub location: String,
    #[facet(default)]
    pub tags: Vec<String>,
}

/// Identity resolved for a new instance.
#[derive(Debug, Clone)]
pub struct Identity {
    pub alias: String,
    pub mac_address: String,
}

/// Everything from the command line that is not a validated launch parameter.
#[derive(Debug, Clone)]
pub struct LaunchOptions<'a> {
    pub image: &'a str,
    pub cloud_init: &'a Path,
    pub vmnet: bool,
}

/// Assemble the configuration record for a new instance. Pure; no I/O.
pub fn build(
    params: &LaunchParams,
    identity: Identity,
    options: &LaunchOptions<'_>,
    paths: &Paths,
) -> InstanceConfig {
    let arch = params.arch;
    let firmware = arch.firmware();
    let location = paths.instance_dir(&identity.alias);

    InstanceConfig {
        image: image_file_name(options.image, arch.as_str(), firmware),
        arch: arch.as_str().to_string(),
        cpu: params.cpu,
        memory: params.memory,
        disk: params.disk.clone(),
        ports: params.ports.clone(),
        mount: params.mount.as_ref().map(|p| p.display().to_string()),
        ssh_port: params.ssh_port,
        mac_address: identity.mac_address,
        machine_ip: MACHINE_IP.to_string(),
        vmnet: options.vmnet,
        firmware: firmware.to_string(),
        ssh_user: SSH_USER.to_string(),
        ssh_password: SSH_PASSWORD.to_string(),
        root_username: ROOT_USERNAME.to_string(),
        root_password: ROOT_PASSWORD.to_string(),
        cloud_init: options.cloud_init.display().to_string(),
        location: location.display().to_string(),
        tags: Vec::new(),
        alias: identity.alias,
    }
}

/// Cached base image for an image version, e.g.
/// `alpine_3.20.3` → `nocloud_alpine-3.20.3-x86_64-bios-cloudinit-r0.qcow2`.
pub fn image_file_name(image: &str, arch: &str, firmware: &str) -> String {
    // `--image` names a release as `alpine_<version>`; the upstream cloud
    // images carry only the version.
    let version = image.strip_prefix("alpine_").unwrap_or(image);
    format!("nocloud_alpine-{version}-{arch}-{firmware}-cloudinit-r0.qcow2")
}

// ── persistence ───────────────────────────────────────────

pub fn load(path: &Path) -> Result<InstanceConfig, MacpineError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| MacpineError::io(format!("failed to read {}", path.display()), e))?;

    facet_yaml::from_str(&contents).map_err(|e| MacpineError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

pub fn save(path: &Path, config: &InstanceConfig) -> Result<(), MacpineError> {
    let yaml = facet_yaml::to_string(config).map_err(|e| MacpineError::ConfigSerialize {
        alias: config.alias.clone(),
        message: e.to_string(),
    })?;

    std::fs::write(path, yaml)
        .map_err(|e| MacpineError::io(format!("failed to write {}", path.display()), e))?;
    tracing::debug!(path = %path.display(), "saved instance config");
    Ok(())
}
