//! HTTP clients for the upstream services
//!
//! - [`PortalClient`]: machine registry, DCP configs and sensor history
//! - [`AiClient`]: anomaly histories recorded by the inference service

mod ai;
mod portal;

pub use ai::AiClient;
pub use portal::PortalClient;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Upstream call failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} request {path} failed: {source}")]
    Transport {
        service: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status} for {path}: {body}")]
    Status {
        service: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("invalid {service} response for {path}: {source}")]
    Decode {
        service: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Upstream HTTP status, when the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// JSON-over-HTTP wrapper shared by both service clients
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    service: &'static str,
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub(crate) fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("{service}: {e}")))?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} request: {} {}", self.service, method, path);
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::CONTENT_TYPE, "application/json")
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await.map_err(|e| ClientError::Transport {
            service: self.service,
            path: path.to_string(),
            source: e,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{} error: {} {} {}", self.service, status.as_u16(), path, body);
        Err(ClientError::Status {
            service: self.service,
            path: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    #[instrument(skip(self, query), fields(service = self.service))]
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        let builder = self.request(Method::GET, path).query(query);
        let response = self.send(path, builder).await?;
        response.json::<T>().await.map_err(|e| ClientError::Decode {
            service: self.service,
            path: path.to_string(),
            source: e,
        })
    }

    /// Send a mutation; the response body is ignored.
    #[instrument(skip(self, body), fields(service = self.service))]
    pub(crate) async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<()> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(path, builder).await.map(|_| ())
    }
}
