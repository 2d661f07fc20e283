//! Launch flag validation.
//!
//! Every launch flag arrives as the raw string the user typed. `validate`
//! turns them into a typed [`LaunchParams`], stopping at the first bad field.

use std::fmt;
use std::path::{Path, PathBuf};

use facet::Facet;

use crate::error::MacpineError;
use crate::ports::{self, PortForward};

/// Raw launch flags, exactly as given on the command line.
#[derive(Debug, Clone)]
pub struct LaunchArgs {
    pub arch: String,
    pub cpu: String,
    pub memory: String,
    pub disk: String,
    pub ssh_port: String,
    pub ports: String,
    pub mount: String,
}

/// Guest architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Aarch64,
    X86_64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Aarch64 => "aarch64",
            Arch::X86_64 => "x86_64",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "aarch64" => Some(Arch::Aarch64),
            "x86_64" => Some(Arch::X86_64),
            _ => None,
        }
    }

    /// Architecture of the machine we are running on, if it can host guests.
    pub fn host() -> Option<Self> {
        Self::parse(std::env::consts::ARCH)
    }

    /// Boot firmware mode for this architecture.
    pub fn firmware(self) -> &'static str {
        match self {
            Arch::Aarch64 => "uefi",
            Arch::X86_64 => "bios",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disk size as typed: a magnitude and an optional `K`/`M`/`G` suffix.
/// An empty suffix means bytes.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct DiskSize {
    pub magnitude: u64,
    #[facet(default)]
    pub suffix: String,
}

impl fmt::Display for DiskSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.suffix)
    }
}

const DISK_SUFFIXES: [&str; 4] = ["", "K", "M", "G"];

/// Validated launch parameters.
#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub arch: Arch,
    pub cpu: u32,
    pub memory: u32,
    pub disk: DiskSize,
    pub ssh_port: u16,
    pub ports: Vec<PortForward>,
    pub mount: Option<PathBuf>,
}

pub fn validate(args: &LaunchArgs) -> Result<LaunchParams, MacpineError> {
    let arch = validate_arch(&args.arch, Arch::host())?;

    let cpu = parse_int(&args.cpu)
        .filter(|n| *n >= 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            MacpineError::validation("cpu", "number of cpus (-c) must be a positive integer")
        })?;

    let memory = parse_int(&args.memory)
        .filter(|n| *n >= 256)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            MacpineError::validation(
                "memory",
                "memory (-m) must be a positive integer greater than 256",
            )
        })?;

    let disk = parse_disk_size(&args.disk)?;

    let ssh = parse_int(&args.ssh_port)
        .filter(|n| *n >= 0)
        .ok_or_else(|| {
            MacpineError::validation("ssh", "ssh port (-s) must be a positive integer")
        })?;
    let ssh_port = u16::try_from(ssh).map_err(|_| {
        MacpineError::validation("ssh", format!("ssh port (-s) {ssh} is out of range (0-65535)"))
    })?;

    let ports = ports::parse_ports(&args.ports)?;

    let mount = if args.mount.is_empty() {
        None
    } else {
        Some(validate_mount(Path::new(&args.mount))?)
    };

    Ok(LaunchParams {
        arch,
        cpu,
        memory,
        disk,
        ssh_port,
        ports,
        mount,
    })
}

fn validate_arch(s: &str, host: Option<Arch>) -> Result<Arch, MacpineError> {
    if s.is_empty() {
        return host.ok_or_else(|| {
            MacpineError::validation(
                "arch",
                format!("unsupported host architecture: {}", std::env::consts::ARCH),
            )
        });
    }
    Arch::parse(s).ok_or_else(|| {
        MacpineError::validation("arch", "unsupported guest architecture. use x86_64 or aarch64")
    })
}

/// Integer parse with the usual optional sign, no surrounding whitespace.
fn parse_int(s: &str) -> Option<i64> {
    s.parse::<i64>().ok()
}

/// Parse a disk size such as `"5G"`.
///
/// Digits and uppercase letters are collected separately, each in input
/// order; anything else is dropped. So `"G5"` and `"5G"` are the same size.
pub fn parse_disk_size(s: &str) -> Result<DiskSize, MacpineError> {
    let mut digits = String::new();
    let mut suffix = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_uppercase() {
            suffix.push(c);
        }
    }

    let magnitude = digits.parse::<u64>().map_err(|_| {
        MacpineError::validation(
            "disk",
            "disk size (-d) must be a positive integer optionally followed by K, M, or G",
        )
    })?;

    if !DISK_SUFFIXES.contains(&suffix.as_str()) {
        return Err(MacpineError::validation(
            "disk",
            "disk size suffix must be K, M, or G",
        ));
    }

    Ok(DiskSize { magnitude, suffix })
}

/// Check a requested instance name. Empty means "generate one".
///
/// The name becomes a directory directly under `~/.macpine`, next to the
/// image cache, so it may not be `cache`, start with a dot or contain a path
/// separator.
pub fn validate_name(name: &str) -> Result<(), MacpineError> {
    if name.is_empty() {
        return Ok(());
    }
    let reason = if name.trim().is_empty() {
        "must not be blank"
    } else if name == "cache" {
        "'cache' is reserved for the image cache"
    } else if name.starts_with('.') {
        "must not start with '.'"
    } else if name.contains(['/', '\\']) {
        "must not contain a path separator"
    } else {
        return Ok(());
    };
    Err(MacpineError::validation(
        "name",
        format!("invalid instance name (-n) '{name}': {reason}"),
    ))
}

fn validate_mount(path: &Path) -> Result<PathBuf, MacpineError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(path.to_path_buf()),
        Ok(_) => Err(MacpineError::validation(
            "mount",
            format!("mount target {} is not a directory", path.display()),
        )),
        Err(_) => Err(MacpineError::validation(
            "mount",
            format!("mount target {} does not exist", path.display()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> LaunchArgs {
        LaunchArgs {
            arch: "x86_64".into(),
            cpu: "2".into(),
            memory: "2048".into(),
            disk: "5G".into(),
            ssh_port: "22".into(),
            ports: String::new(),
            mount: String::new(),
        }
    }

    fn failing_field(args: &LaunchArgs) -> &'static str {
        match validate(args) {
            Err(MacpineError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_validate() {
        let p = validate(&args()).unwrap();
        assert_eq!(p.arch, Arch::X86_64);
        assert_eq!(p.cpu, 2);
        assert_eq!(p.memory, 2048);
        assert_eq!(p.disk.to_string(), "5G");
        assert_eq!(p.ssh_port, 22);
        assert!(p.ports.is_empty());
        assert!(p.mount.is_none());
    }

    #[test]
    fn disk_suffix_position_is_ignored() {
        for input in ["5G", "G5", "05G"] {
            let d = parse_disk_size(input).unwrap();
            assert_eq!(d.magnitude, 5, "input {input}");
            assert_eq!(d.suffix, "G", "input {input}");
        }
    }

    #[test]
    fn disk_drops_other_characters() {
        let d = parse_disk_size("1 0-M").unwrap();
        assert_eq!(d.magnitude, 10);
        assert_eq!(d.suffix, "M");
        // lowercase letters are not suffix characters
        assert_eq!(parse_disk_size("512k").unwrap().suffix, "");
    }

    #[test]
    fn disk_raw_bytes() {
        let d = parse_disk_size("1073741824").unwrap();
        assert_eq!(d.magnitude, 1073741824);
        assert!(d.suffix.is_empty());
    }

    #[test]
    fn disk_rejects_bad_suffix_and_empty_magnitude() {
        assert!(parse_disk_size("5T").is_err());
        assert!(parse_disk_size("5GB").is_err());
        assert!(parse_disk_size("G").is_err());
        assert!(parse_disk_size("").is_err());
    }

    #[test]
    fn memory_lower_bound() {
        let mut a = args();
        a.memory = "255".into();
        assert_eq!(failing_field(&a), "memory");
        a.memory = "-10".into();
        assert_eq!(failing_field(&a), "memory");
        a.memory = "lots".into();
        assert_eq!(failing_field(&a), "memory");
        a.memory = "256".into();
        assert_eq!(validate(&a).unwrap().memory, 256);
    }

    #[test]
    fn cpu_must_be_non_negative() {
        let mut a = args();
        a.cpu = "-1".into();
        assert_eq!(failing_field(&a), "cpu");
        a.cpu = "two".into();
        assert_eq!(failing_field(&a), "cpu");
        a.cpu = "0".into();
        assert_eq!(validate(&a).unwrap().cpu, 0);
    }

    #[test]
    fn ssh_port_range() {
        let mut a = args();
        a.ssh_port = "-22".into();
        assert_eq!(failing_field(&a), "ssh");
        a.ssh_port = "70000".into();
        assert_eq!(failing_field(&a), "ssh");
        a.ssh_port = "2222".into();
        assert_eq!(validate(&a).unwrap().ssh_port, 2222);
    }

    #[test]
    fn arch_rules() {
        let mut a = args();
        a.arch = "riscv64".into();
        assert_eq!(failing_field(&a), "arch");
        a.arch = "aarch64".into();
        assert_eq!(validate(&a).unwrap().arch, Arch::Aarch64);

        assert_eq!(validate_arch("", Some(Arch::Aarch64)).unwrap(), Arch::Aarch64);
        assert!(validate_arch("", None).is_err());
    }

    #[test]
    fn first_failing_field_wins() {
        let mut a = args();
        a.cpu = "x".into();
        a.memory = "1".into();
        a.disk = "5T".into();
        assert_eq!(failing_field(&a), "cpu");
    }

    #[test]
    fn port_errors_surface_unchanged() {
        let mut a = args();
        a.ports = "80,nope".into();
        let err = validate(&a).unwrap_err();
        let direct = ports::parse_ports("80,nope").unwrap_err();
        assert_eq!(err.to_string(), direct.to_string());
    }

    #[test]
    fn mount_must_be_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args();

        a.mount = dir.path().to_str().unwrap().into();
        assert_eq!(validate(&a).unwrap().mount.as_deref(), Some(dir.path()));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        a.mount = file.to_str().unwrap().into();
        let err = validate(&a).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));

        let missing = dir.path().join("missing");
        a.mount = missing.to_str().unwrap().into();
        let err = validate(&a).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn instance_names() {
        for ok in ["", "web", "my-vm", "db_1", "cache2", "a.b"] {
            assert!(validate_name(ok).is_ok(), "expected '{ok}' to be accepted");
        }
        for bad in ["cache", ".hidden", ".", "..", "../x", "a/b", "a\\b", " ", "\t"] {
            let err = validate_name(bad).unwrap_err();
            assert!(
                matches!(err, MacpineError::Validation { field: "name", .. }),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn firmware_by_arch() {
        assert_eq!(Arch::Aarch64.firmware(), "uefi");
        assert_eq!(Arch::X86_64.firmware(), "bios");
    }
}
