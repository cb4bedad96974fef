//! netpulse-daemon entry point.
//!
//! Parses CLI arguments, loads and validates configuration, initializes
//! logging, and hands control to the orchestrator.

use anyhow::Result;
use clap::Parser;

use netpulse_core::config::NetpulseConfig;
use netpulse_daemon::cli::DaemonCli;
use netpulse_daemon::logging;
use netpulse_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    let mut config = NetpulseConfig::load(&args.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", args.config.display(), e))?;

    // CLI overrides take precedence over config file and environment
    if let Some(level) = &args.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.general.log_format = format.clone();
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if args.validate {
        println!("configuration OK: {}", args.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "netpulse daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await
}
