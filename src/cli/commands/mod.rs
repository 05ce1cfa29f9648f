//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod collect;
mod config_cmd;
mod extract;
mod init;
mod snapshot;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Config;

pub use collect::CollectArgs;
pub use extract::OutputFormat;

#[derive(Parser)]
#[command(name = "lotwatch")]
#[command(about = "Polling collector for vehicle auction listings")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML, YAML or JSON); discovered automatically when omitted
    #[arg(long, global = true, env = "LOTWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the listing page and persist every listing until interrupted
    Collect(CollectArgs),

    /// Render the listing page once and save its containers as JSON
    Snapshot {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract listings from a saved snapshot without persisting them
    Extract {
        /// Snapshot JSON written by `lotwatch snapshot`
        file: PathBuf,
        /// Page layout (defaults to the configured layout)
        #[arg(short, long)]
        layout: Option<crate::models::Layout>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Create the configured sink table
    Init,

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Collect(args) => collect::cmd_collect(config, args).await,
        Commands::Snapshot { output } => snapshot::cmd_snapshot(&config, output.as_deref()).await,
        Commands::Extract {
            file,
            layout,
            format,
        } => {
            let layout = layout.unwrap_or(config.target.layout);
            extract::cmd_extract(&file, layout, format).await
        }
        Commands::Init => init::cmd_init(&config).await,
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
