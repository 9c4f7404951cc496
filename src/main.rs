// ABOUTME: Entry point for the tarploy CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, Target};
use std::env;
use tarploy::config::{self, Config};
use tarploy::deploy::DeployKind;
use tarploy::error::Result;
use tarploy::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("tarploy=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli.command, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(mode);

    match command {
        Commands::Init { service, force } => {
            config::init_config(&cwd, service.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            target,
            node,
            simple,
        } => {
            let config = load_config(&cwd, &target)?;
            let kind = if node {
                DeployKind::Node
            } else if simple {
                DeployKind::Simple
            } else {
                config.kind
            };
            commands::deploy(config, kind, output).await
        }
        Commands::Status { target } => commands::status(load_config(&cwd, &target)?, output).await,
        Commands::Start { target } => commands::start(load_config(&cwd, &target)?, output).await,
        Commands::Stop { target } => commands::stop(load_config(&cwd, &target)?, output).await,
    }
}

/// Load `.env` files, discover the config and apply the destination overlay.
fn load_config(cwd: &std::path::Path, target: &Target) -> Result<Config> {
    config::load_env_files(cwd, target.destination.as_deref());

    let config = Config::discover(cwd)?;
    match &target.destination {
        Some(dest) => config.for_destination(dest),
        None => Ok(config),
    }
}
