//! State shared by the page modules and request handlers

use std::sync::Arc;

use crate::alerts::AlertStreamStatus;
use crate::cache::QueryCache;
use crate::client::{AiClient, ClientResult, PortalClient};
use crate::config::DashboardConfig;

pub struct AppState {
    pub portal: PortalClient,
    pub ai: AiClient,
    pub cache: QueryCache,
    /// Updated by the alert stream task
    pub alert_status: Arc<AlertStreamStatus>,
}

impl AppState {
    pub fn new(portal: PortalClient, ai: AiClient, cache: QueryCache) -> Self {
        Self {
            portal,
            ai,
            cache,
            alert_status: Arc::new(AlertStreamStatus::default()),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> ClientResult<Self> {
        let timeout = config.request_timeout();
        Ok(Self::new(
            PortalClient::new(&config.upstream.portal_url, timeout)?,
            AiClient::new(&config.upstream.ai_url, timeout)?,
            QueryCache::new(config.cache_options()),
        ))
    }
}
