use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use keeper_supervisor::config::default_config_path;
use keeper_supervisor::{ConfigError, Keeper, KeeperConfig, ServiceLifecycle};

/// Service Keeper - keeps one executable running and adopts staged updates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML). Defaults to the keeper executable
    /// path with a `.yaml` extension.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path().context("Cannot determine default config path")?,
    };

    let config = match KeeperConfig::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e @ ConfigError::NeedsConfiguration { .. }) => {
            // No config means no log level yet; fall back to the default.
            initialize_logging(args.debug, "info");
            error!("{}", e);
            return Err(e.into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load {}", config_path.display()))
        }
    };

    initialize_logging(args.debug, &config.log_level);
    info!("Starting keeper {}", keeper_supervisor::VERSION);
    info!("Config file: {}", config_path.display());

    let keeper = Keeper::from_config(&config)?;
    run_foreground(&keeper).await
}

/// Host the service in this process: start it, then block until the
/// supervisor returns. Signals are handled by the service itself.
async fn run_foreground(keeper: &Keeper) -> Result<()> {
    keeper.on_start().await?;

    match keeper.wait().await {
        Ok(()) => {
            info!("{} shut down successfully", keeper.descriptor().display_name);
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", keeper.descriptor().display_name, e);
            Err(e.into())
        }
    }
}

fn initialize_logging(debug: bool, config_level: &str) {
    let level = if debug { "debug" } else { config_level };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();
}
