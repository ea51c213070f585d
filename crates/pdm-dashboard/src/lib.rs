//! PdM Dashboard - predictive-maintenance monitoring console
//!
//! Fronts two upstream services:
//! - the portal backend (machines, data-collection configs, sensor history,
//!   live anomaly alerts over server-sent events)
//! - the AI service (recorded anomaly histories)
//!
//! and serves a web UI, a JSON API and a WebSocket alert relay on top of them.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdm_dashboard::{DashboardConfig, DashboardServer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = DashboardConfig::new()
//!     .with_port(3000)
//!     .with_portal_url("http://localhost:8080")
//!     .with_ai_url("http://localhost:8000");
//!
//! let server = DashboardServer::new(config)?;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod cache;
pub mod chart;
pub mod client;
pub mod config;
mod dashboard;
pub mod export;
pub mod format;
pub mod model;
pub mod pages;
pub mod pagination;
pub mod state;
pub mod validation;

pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{
    ALERTS_TOPIC, ApiError, ApiResponse, DashboardServer, HealthStatus, ListQuery, ServerResult,
    WebSocketClient, WebSocketHandler, WebSocketMessage, create_api_router,
};
pub use state::AppState;
