// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tarploy")]
#[command(about = "Deploy a tarball to a systemd service over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a tarploy.yml configuration file
    Init {
        /// Service name to put in the template
        #[arg(short, long)]
        service: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Stop the service, upload and unpack the tarball, then start it again
    Deploy {
        #[command(flatten)]
        target: Target,

        /// Run "npm ci --production" before starting the service
        #[arg(long, conflicts_with = "simple")]
        node: bool,

        /// Skip the npm install even if the config asks for a node deploy
        #[arg(long)]
        simple: bool,
    },

    /// Show the service status reported by systemctl
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Start the service
    Start {
        #[command(flatten)]
        target: Target,
    },

    /// Stop the service
    Stop {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
pub struct Target {
    /// Target destination (defined in config)
    #[arg(short, long)]
    pub destination: Option<String>,
}
