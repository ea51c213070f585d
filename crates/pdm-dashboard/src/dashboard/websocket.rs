//! WebSocket relay for live anomaly alerts
//!
//! Browsers connect to `/ws` and receive every [`Notification`] produced by
//! the alert stream on the `alerts` topic, plus periodic heartbeats.

use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::{Notification, NotificationSink};

/// Topic carrying anomaly notifications
pub const ALERTS_TOPIC: &str = "alerts";

/// Messages queued per client before further ones are dropped
const CLIENT_QUEUE_CAPACITY: usize = 256;

/// WebSocket message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WebSocketMessage {
    /// Anomaly notification
    #[serde(rename = "notification")]
    Notification(Notification),

    /// Heartbeat
    #[serde(rename = "heartbeat")]
    Heartbeat { timestamp: u64 },

    /// Subscribe to specific updates
    #[serde(rename = "subscribe")]
    Subscribe { topics: Vec<String> },

    /// Unsubscribe from updates
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topics: Vec<String> },

    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}

/// WebSocket client tracking
#[derive(Debug)]
pub struct WebSocketClient {
    pub id: String,
    pub connected_at: u64,
    pub subscriptions: Vec<String>,
    sender: mpsc::Sender<WebSocketMessage>,
}

impl WebSocketClient {
    pub fn new(id: String, sender: mpsc::Sender<WebSocketMessage>) -> Self {
        Self {
            id,
            connected_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            subscriptions: vec![ALERTS_TOPIC.to_string()],
            sender,
        }
    }

    /// Queue a message without waiting for room
    pub fn try_send(&self, msg: WebSocketMessage) -> Result<(), TrySendError<WebSocketMessage>> {
        self.sender.try_send(msg)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic || t == "*")
    }

    fn subscribe(&mut self, topics: Vec<String>) {
        for topic in topics {
            if !self.subscriptions.contains(&topic) {
                self.subscriptions.push(topic);
            }
        }
    }

    fn unsubscribe(&mut self, topics: &[String]) {
        self.subscriptions.retain(|t| !topics.contains(t));
    }
}

/// WebSocket handler state
#[derive(Default)]
pub struct WebSocketHandler {
    clients: Arc<RwLock<HashMap<String, WebSocketClient>>>,
}

impl WebSocketHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a message to every client subscribed to `topic`.
    ///
    /// Never waits on a client: a full queue drops the message for that
    /// client only, and clients whose socket task has ended are removed.
    pub async fn broadcast(&self, topic: &str, msg: WebSocketMessage) {
        self.deliver(msg, |client| client.is_subscribed(topic)).await;
    }

    async fn broadcast_all(&self, msg: WebSocketMessage) {
        self.deliver(msg, |_| true).await;
    }

    async fn deliver(&self, msg: WebSocketMessage, wanted: impl Fn(&WebSocketClient) -> bool) {
        let closed: Vec<String> = {
            let clients = self.clients.read().await;
            clients
                .values()
                .filter(|client| wanted(client))
                .filter_map(|client| match client.try_send(msg.clone()) {
                    Ok(()) => None,
                    Err(TrySendError::Full(_)) => {
                        warn!("Client {} is not keeping up, message dropped", client.id);
                        None
                    }
                    Err(TrySendError::Closed(_)) => Some(client.id.clone()),
                })
                .collect()
        };

        if !closed.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &closed {
                debug!("Removing closed client {}", id);
                clients.remove(id);
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    /// Heartbeat every `interval` until `shutdown` is cancelled
    pub fn start_heartbeat(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        info!("Starting WebSocket heartbeat with interval {:?}", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
                        self.broadcast_all(WebSocketMessage::Heartbeat { timestamp }).await;
                    }
                }
            }
        })
    }

    /// Handle WebSocket upgrade
    pub async fn handle_upgrade(
        ws: WebSocketUpgrade,
        State(handler): State<Arc<WebSocketHandler>>,
    ) -> impl IntoResponse {
        ws.on_upgrade(move |socket| handler.handle_socket(socket))
    }

    async fn handle_socket(self: Arc<Self>, socket: WebSocket) {
        let client_id = uuid::Uuid::new_v4().to_string();
        info!("WebSocket client connected: {}", client_id);

        let (mut sender, mut receiver) = socket.split();
        let (tx, mut rx) = mpsc::channel::<WebSocketMessage>(CLIENT_QUEUE_CAPACITY);

        self.clients
            .write()
            .await
            .insert(client_id.clone(), WebSocketClient::new(client_id.clone(), tx.clone()));

        let send_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to encode WebSocket message: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        let clients = self.clients.clone();
        let client_id_clone = client_id.clone();
        let receive_task = tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        let reply = handle_client_message(&clients, &client_id_clone, &text).await;
                        if let Some(reply) = reply
                            && tx.send(reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Ping(_)) => debug!("Ping from client {}", client_id_clone),
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        tokio::select! {
            _ = send_task => {}
            _ = receive_task => {}
        }

        self.clients.write().await.remove(&client_id);
        info!("WebSocket client disconnected: {}", client_id);
    }
}

/// Apply one client message; returns the reply to send back, if any.
async fn handle_client_message(
    clients: &RwLock<HashMap<String, WebSocketClient>>,
    client_id: &str,
    text: &str,
) -> Option<WebSocketMessage> {
    let msg = match serde_json::from_str::<WebSocketMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            return Some(WebSocketMessage::Error {
                message: format!("unrecognised message: {e}"),
            });
        }
    };

    match msg {
        WebSocketMessage::Subscribe { topics } => {
            if let Some(client) = clients.write().await.get_mut(client_id) {
                client.subscribe(topics);
            }
            None
        }
        WebSocketMessage::Unsubscribe { topics } => {
            if let Some(client) = clients.write().await.get_mut(client_id) {
                client.unsubscribe(&topics);
            }
            None
        }
        WebSocketMessage::Heartbeat { .. } => {
            debug!("Heartbeat from client {}", client_id);
            None
        }
        other => {
            debug!("Ignoring message from client {}: {:?}", client_id, other);
            None
        }
    }
}

#[async_trait]
impl NotificationSink for WebSocketHandler {
    async fn notify(&self, notification: Notification) {
        self.broadcast(ALERTS_TOPIC, WebSocketMessage::Notification(notification))
            .await;
    }
}

/// Create WebSocket route handler
pub fn create_websocket_route(handler: Arc<WebSocketHandler>) -> axum::routing::MethodRouter {
    axum::routing::get(move |ws: WebSocketUpgrade| {
        let h = handler.clone();
        async move { WebSocketHandler::handle_upgrade(ws, State(h)).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::NotificationVariant;
    use crate::model::Severity;

    fn notification() -> Notification {
        Notification {
            title: "⚠️ Press 3 anomaly detected".to_string(),
            description: "Detected at: 2024-05-01 12:30:00\nSeverity: Danger".to_string(),
            variant: NotificationVariant::Destructive,
            machine_id: 3,
            severity: Severity::Critical,
            anomaly_probability: 0.91,
        }
    }

    #[test]
    fn test_websocket_message_serialize() {
        let msg = WebSocketMessage::Heartbeat { timestamp: 12345 };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"heartbeat","data":{"timestamp":12345}}"#);

        let json = serde_json::to_value(WebSocketMessage::Notification(notification())).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["data"]["variant"], "destructive");
        assert_eq!(json["data"]["machineId"], 3);
    }

    #[test]
    fn test_websocket_client_subscription() {
        let (tx, _) = mpsc::channel(16);
        let mut client = WebSocketClient::new("test-1".to_string(), tx);

        assert!(client.is_subscribed(ALERTS_TOPIC));

        client.unsubscribe(&[ALERTS_TOPIC.to_string()]);
        assert!(!client.is_subscribed(ALERTS_TOPIC));

        client.subscribe(vec!["*".to_string()]);
        assert!(client.is_subscribed("anything"));
    }

    #[tokio::test]
    async fn test_client_messages() {
        let clients = RwLock::new(HashMap::new());
        let (tx, _rx) = mpsc::channel(16);
        clients
            .write()
            .await
            .insert("c1".to_string(), WebSocketClient::new("c1".to_string(), tx));

        let reply = handle_client_message(
            &clients,
            "c1",
            r#"{"type":"unsubscribe","data":{"topics":["alerts"]}}"#,
        )
        .await;
        assert!(reply.is_none());
        assert!(!clients.read().await["c1"].is_subscribed(ALERTS_TOPIC));

        let reply = handle_client_message(&clients, "c1", "hello").await;
        assert!(matches!(reply, Some(WebSocketMessage::Error { .. })));
    }

    #[tokio::test]
    async fn test_notifications_reach_subscribed_clients() {
        let handler = WebSocketHandler::new();
        let (tx, mut rx) = mpsc::channel(16);
        handler
            .clients
            .write()
            .await
            .insert("c1".to_string(), WebSocketClient::new("c1".to_string(), tx));
        let (tx, mut muted_rx) = mpsc::channel(16);
        let mut muted = WebSocketClient::new("c2".to_string(), tx);
        muted.unsubscribe(&[ALERTS_TOPIC.to_string()]);
        handler.clients.write().await.insert("c2".to_string(), muted);

        handler.notify(notification()).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            WebSocketMessage::Notification(notification())
        );
        assert!(muted_rx.try_recv().is_err());
        assert_eq!(handler.client_count().await, 2);
    }

    #[tokio::test]
    async fn test_stalled_client_does_not_block_notifications() {
        let handler = WebSocketHandler::new();
        // Never drained
        let (tx, _stalled_rx) = mpsc::channel(1);
        handler
            .clients
            .write()
            .await
            .insert("stalled".to_string(), WebSocketClient::new("stalled".to_string(), tx));
        let (tx, mut rx) = mpsc::channel(16);
        handler
            .clients
            .write()
            .await
            .insert("reader".to_string(), WebSocketClient::new("reader".to_string(), tx));

        for _ in 0..5 {
            tokio::time::timeout(Duration::from_secs(1), handler.notify(notification()))
                .await
                .expect("notify blocked on a full client queue");
            assert_eq!(
                rx.try_recv().unwrap(),
                WebSocketMessage::Notification(notification())
            );
        }

        // The stalled client stays registered; it only misses messages.
        assert_eq!(handler.client_count().await, 2);
        tokio::time::timeout(Duration::from_secs(1), handler.clients.write())
            .await
            .expect("client registry still locked");
    }

    #[tokio::test]
    async fn test_closed_clients_are_removed_on_broadcast() {
        let handler = WebSocketHandler::new();
        let (tx, rx) = mpsc::channel(16);
        handler
            .clients
            .write()
            .await
            .insert("gone".to_string(), WebSocketClient::new("gone".to_string(), tx));
        drop(rx);

        handler.notify(notification()).await;

        assert_eq!(handler.client_count().await, 0);
    }
}
