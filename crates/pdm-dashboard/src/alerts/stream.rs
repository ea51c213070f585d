use futures::StreamExt;
use reqwest::{Client, header};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::notification::{Notification, NotificationSink};
use super::sse::{SseDecoder, SseEvent};
use crate::client::{ClientError, ClientResult};
use crate::model::AnomalyAlert;

/// Event name carrying an [`AnomalyAlert`]
pub const ANOMALY_ALERT_EVENT: &str = "anomaly-alert";

const SERVICE: &str = "portal-sse";

/// Live alert subscription settings
#[derive(Debug, Clone)]
pub struct AlertStreamConfig {
    /// Full URL of the push endpoint
    pub url: String,
    /// Sent as `clientId`; the portal assigns one when absent
    pub client_id: Option<String>,
    /// Fixed wait between a failure and the next connection attempt
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl AlertStreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_id: None,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Connection state of the alert stream, readable from request handlers
#[derive(Debug, Default)]
pub struct AlertStreamStatus {
    connected: AtomicBool,
    connections: AtomicU64,
    alerts_received: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStreamSnapshot {
    pub connected: bool,
    pub connections: u64,
    pub alerts_received: u64,
}

impl AlertStreamStatus {
    pub fn snapshot(&self) -> AlertStreamSnapshot {
        AlertStreamSnapshot {
            connected: self.connected.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            alerts_received: self.alerts_received.load(Ordering::Relaxed),
        }
    }
}

/// Subscribes to the portal's anomaly alerts and forwards them to a sink,
/// reconnecting after a fixed delay whenever the connection drops.
pub struct AlertStream {
    client: Client,
    config: AlertStreamConfig,
    sink: Arc<dyn NotificationSink>,
    status: Arc<AlertStreamStatus>,
}

impl AlertStream {
    pub fn new(config: AlertStreamConfig, sink: Arc<dyn NotificationSink>) -> ClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("{SERVICE}: {e}")))?;

        Ok(Self {
            client,
            config,
            sink,
            status: Arc::new(AlertStreamStatus::default()),
        })
    }

    /// Report into an existing status handle instead of a private one.
    pub fn with_status(mut self, status: Arc<AlertStreamStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> Arc<AlertStreamStatus> {
        self.status.clone()
    }

    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let delay = self.config.reconnect_delay;
        info!("Subscribing to anomaly alerts at {}", self.config.url);

        loop {
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.consume() => outcome,
            };
            self.status.connected.store(false, Ordering::Relaxed);

            match outcome {
                Ok(()) => warn!("Alert stream closed, reconnecting in {:?}", delay),
                Err(e) => error!("Alert stream error: {}, reconnecting in {:?}", e, delay),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.status.connected.store(false, Ordering::Relaxed);
        info!("Alert stream stopped");
    }

    /// One connection: read until the server closes or the transport fails.
    async fn consume(&self) -> ClientResult<()> {
        let mut request = self
            .client
            .get(&self.config.url)
            .header(header::ACCEPT, "text/event-stream");
        if let Some(client_id) = &self.config.client_id {
            request = request.query(&[("clientId", client_id)]);
        }

        let transport = |e| ClientError::Transport {
            service: SERVICE,
            path: self.config.url.clone(),
            source: e,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                service: SERVICE,
                path: self.config.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        self.status.connected.store(true, Ordering::Relaxed);
        self.status.connections.fetch_add(1, Ordering::Relaxed);
        info!("Alert stream connected");

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(transport)?;
            for event in decoder.feed(&chunk) {
                self.handle_event(event).await;
            }
        }
        Ok(())
    }

    async fn handle_event(&self, event: SseEvent) {
        if event.event != ANOMALY_ALERT_EVENT {
            debug!("Ignoring '{}' event", event.event);
            return;
        }

        match serde_json::from_str::<AnomalyAlert>(&event.data) {
            Ok(alert) => {
                self.status.alerts_received.fetch_add(1, Ordering::Relaxed);
                info!(
                    machine_id = alert.machine_id,
                    severity = %alert.severity,
                    "Anomaly alert received"
                );
                self.sink.notify(Notification::from(&alert)).await;
            }
            Err(e) => warn!("Discarding malformed anomaly alert: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_config_defaults() {
        let config = AlertStreamConfig::new("http://localhost:8080/api/sse/subscribe");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.client_id.is_none());

        let config = config
            .with_client_id("dashboard-1")
            .with_reconnect_delay(Duration::from_millis(50));
        assert_eq!(config.client_id.as_deref(), Some("dashboard-1"));
        assert_eq!(config.reconnect_delay, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_only_alert_events_reach_the_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stream = AlertStream::new(AlertStreamConfig::new("http://127.0.0.1:9"), Arc::new(tx)).unwrap();

        stream
            .handle_event(SseEvent {
                event: "connect".to_string(),
                data: "connected".to_string(),
                id: None,
            })
            .await;
        stream
            .handle_event(SseEvent {
                event: ANOMALY_ALERT_EVENT.to_string(),
                data: "not json".to_string(),
                id: None,
            })
            .await;
        stream
            .handle_event(SseEvent {
                event: ANOMALY_ALERT_EVENT.to_string(),
                data: r#"{"machineId":1,"machineName":"M1","detectedAt":"2024-05-01T12:30:00","severity":"ALERT","anomalyProbability":0.6}"#.to_string(),
                id: None,
            })
            .await;

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.machine_id, 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(stream.status().snapshot().alerts_received, 1);
    }

    #[tokio::test]
    async fn test_cancelled_stream_stops_while_waiting() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = AlertStreamConfig::new("http://127.0.0.1:9/api/sse/subscribe")
            .with_reconnect_delay(Duration::from_secs(3600));
        let stream = AlertStream::new(config, Arc::new(tx)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = stream.spawn(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stream did not stop")
            .unwrap();
    }
}
