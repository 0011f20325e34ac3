//! Command-line entry point for keyframe retrieval.

pub mod config;
mod search_cmd;

pub use config::{AppConfig, DEFAULT_CONFIG_FILE, HybridConfig};
pub use search_cmd::SearchArgs;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "vidrecall", version, about = "Text-to-keyframe retrieval over a video catalog")]
pub struct Cli {
    /// Path to the TOML config (defaults to ./vidrecall.toml when present)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log progress to stderr (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search keyframes by one or more text queries
    Search(SearchArgs),

    /// Load and validate the config, then print the effective settings
    CheckConfig,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Search(args) => search_cmd::run_search(self.config.as_deref(), args).await,
            Command::CheckConfig => run_check_config(self.config.as_deref()),
        }
    }
}

/// Install the stderr log subscriber. `log` records from the library crates
/// are forwarded through the `tracing-log` bridge.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn run_check_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = AppConfig::load(path)?;
    config.validate()?;
    print!("{}", config.to_toml()?);
    Ok(())
}
