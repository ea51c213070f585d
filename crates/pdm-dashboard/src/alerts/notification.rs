use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::format::format_date_time;
use crate::model::{AnomalyAlert, Severity};

/// Toast style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// User-facing rendering of one live anomaly alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
    pub machine_id: i64,
    pub severity: Severity,
    pub anomaly_probability: f64,
}

impl From<&AnomalyAlert> for Notification {
    fn from(alert: &AnomalyAlert) -> Self {
        let variant = if alert.severity == Severity::Critical {
            NotificationVariant::Destructive
        } else {
            NotificationVariant::Default
        };

        Self {
            title: format!("⚠️ {} anomaly detected", alert.machine_name),
            description: format!(
                "Detected at: {}\nSeverity: {}",
                format_date_time(&alert.detected_at),
                alert.severity.label()
            ),
            variant,
            machine_id: alert.machine_id,
            severity: alert.severity.clone(),
            anomaly_probability: alert.anomaly_probability,
        }
    }
}

/// Receives notifications in arrival order
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

#[async_trait]
impl NotificationSink for mpsc::UnboundedSender<Notification> {
    async fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}
