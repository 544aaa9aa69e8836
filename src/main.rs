//! relaylog server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──HTTP──▶ request id → trace → timeout → body limit → process time
//!                          │
//!                          ├─▶ request_log ──▶ items / root / admin ──▶ journal sink
//!                          │
//!     Client ◀─ws──▶ /ws, /ws/{client_id} ◀──▶ ConnectionRegistry (broadcast)
//! ```

use std::path::PathBuf;

use clap::Parser;

use relaylog::config::validation::validate_config;
use relaylog::config::{load_config, AppConfig, ConfigError};
use relaylog::lifecycle;
use relaylog::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "relaylog", version, about = "Journaling HTTP and websocket chat service")]
struct Cli {
    /// TOML config file; watched for changes while running.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `request_log.path`.
    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(log_file) = cli.log_file {
        config.request_log.path = log_file;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relaylog starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_log = %config.request_log.path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    lifecycle::launch(config, cli.config).await?;
    Ok(())
}
