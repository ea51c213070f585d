//! Web dashboard module
//!
//! - Embedded single-page UI
//! - REST API for machines, DCP configs, sensor data and anomalies
//! - WebSocket relay for live anomaly alerts

mod api;
mod assets;
mod server;
mod websocket;

pub use api::{ApiError, ApiResponse, HealthStatus, ListQuery, create_api_router};
pub use server::{DashboardServer, ServerResult};
pub use websocket::{ALERTS_TOPIC, WebSocketClient, WebSocketHandler, WebSocketMessage};
