use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use macpine::cli::{Cli, Command};
use macpine::error::MacpineError;
use macpine::paths::Paths;
use macpine::tags::{self, TagMode};
use macpine::{engine, launch};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("macpine=info"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}

async fn run(command: Command) -> Result<(), MacpineError> {
    let paths = Paths::from_home()?;

    match command {
        Command::LaunchCloud(args) => {
            let request = args.into_request();
            let engine = engine::create_engine(&paths);
            let config = launch::launch_cloud(&request, &paths, &engine).await?;
            println!("launched: {}", config.alias);
        }
        Command::Tag { name, tags, remove } => {
            let mode = if remove { TagMode::Remove } else { TagMode::Add };
            let result = tags::edit_tags(&paths, &name, &tags, mode)?;
            println!("[{}]", result.join(" "));
        }
    }

    Ok(())
}
