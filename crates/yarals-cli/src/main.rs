//! YARALS - YARA language server
//!
//! This binary listens on a TCP endpoint and serves YARA rule intelligence
//! to editor clients speaking JSON-RPC.

use anyhow::{Context, Result};
use clap::Parser;

mod args;
mod logging;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args.log_level, args.log_json)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting yarals");

    let mut config = if let Some(config_path) = &args.config {
        yarals_core::ServerConfig::load_from(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        yarals_core::ServerConfig::load().context("failed to load configuration")?
    };

    if let Some(host) = args.host {
        config.listener.host = host;
    }
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    config.validate().context("invalid configuration")?;

    tracing::debug!(
        endpoint = %config.listener.address(),
        diagnostics = config.diagnostics.enabled,
        "configuration loaded"
    );

    yarals_core::serve_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
    .context("server error")?;

    tracing::info!("yarals shutdown complete");
    Ok(())
}
