//! Command-line arguments using clap

use clap::Parser;
use std::path::PathBuf;

use pdm_dashboard::DashboardConfig;

/// Predictive-maintenance dashboard server
#[derive(Parser, Debug)]
#[command(name = "pdm-dashboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short = 'c', long, env = "PDM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Portal backend base URL
    #[arg(long)]
    pub portal_url: Option<String>,

    /// AI service base URL
    #[arg(long)]
    pub ai_url: Option<String>,

    /// Do not subscribe to live anomaly alerts
    #[arg(long)]
    pub no_alerts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line values override the loaded configuration.
    pub fn apply(&self, mut config: DashboardConfig) -> DashboardConfig {
        if let Some(host) = &self.host {
            config = config.with_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(url) = &self.portal_url {
            config = config.with_portal_url(url);
        }
        if let Some(url) = &self.ai_url {
            config = config.with_ai_url(url);
        }
        if self.no_alerts {
            config = config.with_alerts(false);
        }
        config
    }
}
