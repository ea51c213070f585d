//! Dashboard configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! file (format picked from its extension), then `PDM_`-prefixed
//! environment variables. Nested keys use `__`, e.g.
//! `PDM_UPSTREAM__PORTAL_URL=http://portal:8080`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::alerts::AlertStreamConfig;
use crate::cache::CacheOptions;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Upstream service locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub portal_url: String,
    pub ai_url: String,
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            portal_url: "http://localhost:8080".to_string(),
            ai_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub stale_time_secs: u64,
    pub retry: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 30,
            retry: 1,
        }
    }
}

/// Live alert subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Path of the push endpoint on the portal
    pub path: String,
    pub client_id: Option<String>,
    pub reconnect_delay_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/api/sse/subscribe".to_string(),
            client_id: None,
            reconnect_delay_ms: 5000,
        }
    }
}

/// Dashboard server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Per-request HTTP spans
    pub enable_tracing: bool,
    pub heartbeat_interval_secs: u64,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub alerts: AlertsConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            enable_tracing: true,
            heartbeat_interval_secs: 30,
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then `path` when given, then `PDM_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("PDM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("upstream.portal_url", &self.upstream.portal_url),
            ("upstream.ai_url", &self.upstream.ai_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(ConfigError::Invalid(format!("{name} is not a URL: {url}")));
            }
        }
        if self.upstream.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "upstream.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn with_portal_url(mut self, url: &str) -> Self {
        self.upstream.portal_url = url.to_string();
        self
    }

    pub fn with_ai_url(mut self, url: &str) -> Self {
        self.upstream.ai_url = url.to_string();
        self
    }

    pub fn with_alerts(mut self, enabled: bool) -> Self {
        self.alerts.enabled = enabled;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.alerts.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            stale_time: Duration::from_secs(self.cache.stale_time_secs),
            retry: self.cache.retry,
        }
    }

    pub fn alert_stream_config(&self) -> AlertStreamConfig {
        let url = format!(
            "{}{}",
            self.upstream.portal_url.trim_end_matches('/'),
            self.alerts.path
        );
        let mut config = AlertStreamConfig::new(url)
            .with_reconnect_delay(Duration::from_millis(self.alerts.reconnect_delay_ms));
        if let Some(client_id) = &self.alerts.client_id {
            config = config.with_client_id(client_id.clone());
        }
        config
    }
}
