use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_IMAGE;
use crate::launch::LaunchRequest;
use crate::validate::LaunchArgs;

#[derive(Parser, Debug)]
#[command(name = "alpine", about = "Create and manage lightweight Alpine VM instances")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a cloud-init enabled instance
    #[command(name = "launch-cloud", visible_aliases = ["create", "new", "l"])]
    LaunchCloud(LaunchCloudArgs),

    /// Add or remove tags from an instance
    Tag {
        /// Instance name
        name: String,

        /// Tags to add (or remove with --remove)
        #[arg(required = true)]
        tags: Vec<String>,

        /// Remove tag(s) rather than add them
        #[arg(short, long)]
        remove: bool,
    },
}

/// Flags are taken as raw strings; validation happens in `validate`.
#[derive(Args, Debug)]
pub struct LaunchCloudArgs {
    /// Path to a cloud-init yaml file to be used for the instance
    #[arg(long = "cloud-init")]
    pub cloud_init: PathBuf,

    /// Image to be launched
    #[arg(short, long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Machine architecture (aarch64 or x86_64). Defaults to host architecture
    #[arg(short, long, default_value = "")]
    pub arch: String,

    /// Number of CPUs to allocate
    #[arg(short, long, default_value = "2")]
    pub cpu: String,

    /// Amount of memory to allocate
    #[arg(short, long, default_value = "2048")]
    pub memory: String,

    /// Disk space (in bytes) to allocate. K, M, G suffixes are supported
    #[arg(short, long, default_value = "5G")]
    pub disk: String,

    /// Path to a host directory to be shared with the instance
    #[arg(long, default_value = "")]
    pub mount: String,

    /// Host port to forward for SSH
    #[arg(short, long, default_value = "22")]
    pub ssh: String,

    /// Forward additional host ports, separated by `,` (HOST[:GUEST][u])
    #[arg(short, long, default_value = "")]
    pub port: String,

    /// Instance name. A random one is generated if empty
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Use macOS vmnet-shared networking
    #[arg(short = 'S', long)]
    pub shared: bool,
}

impl LaunchCloudArgs {
    pub fn into_request(self) -> LaunchRequest {
        LaunchRequest {
            args: LaunchArgs {
                arch: self.arch,
                cpu: self.cpu,
                memory: self.memory,
                disk: self.disk,
                ssh_port: self.ssh,
                ports: self.port,
                mount: self.mount,
            },
            image: self.image,
            name: self.name,
            cloud_init: self.cloud_init,
            vmnet: self.shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_defaults() {
        let cli = Cli::parse_from(["alpine", "launch-cloud", "--cloud-init", "ci.yaml"]);
        let Command::LaunchCloud(args) = cli.command else {
            panic!("expected launch-cloud");
        };
        let req = args.into_request();
        assert_eq!(req.image, "alpine_3.20.3");
        assert_eq!(req.args.cpu, "2");
        assert_eq!(req.args.memory, "2048");
        assert_eq!(req.args.disk, "5G");
        assert_eq!(req.args.ssh_port, "22");
        assert!(req.args.arch.is_empty());
        assert!(req.name.is_empty());
        assert!(!req.vmnet);
    }

    #[test]
    fn launch_requires_cloud_init() {
        assert!(Cli::try_parse_from(["alpine", "launch-cloud"]).is_err());
    }

    #[test]
    fn launch_aliases() {
        for alias in ["create", "new", "l"] {
            let cli = Cli::try_parse_from(["alpine", alias, "--cloud-init", "ci.yaml"]).unwrap();
            assert!(matches!(cli.command, Command::LaunchCloud(_)));
        }
    }

    #[test]
    fn tag_flags() {
        let cli = Cli::parse_from(["alpine", "tag", "web", "db", "prod", "-r"]);
        match cli.command {
            Command::Tag { name, tags, remove } => {
                assert_eq!(name, "web");
                assert_eq!(tags, vec!["db", "prod"]);
                assert!(remove);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["alpine", "tag", "web"]).is_err());
    }
}
