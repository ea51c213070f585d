//! Predictive-maintenance dashboard server

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

use pdm_dashboard::{DashboardConfig, DashboardServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = DashboardConfig::load(cli.config.as_deref())
        .context("failed to load dashboard configuration")?;
    let config = cli.apply(config);
    config.validate()?;

    let server = DashboardServer::new(config).context("failed to create dashboard server")?;
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("dashboard server failed: {e}"))
}
