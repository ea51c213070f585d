//! Live anomaly alerts
//!
//! The portal pushes `anomaly-alert` server-sent events. [`AlertStream`]
//! keeps one subscription open, turns each alert into a [`Notification`]
//! and hands it to a [`NotificationSink`]. A dropped connection is retried
//! after a fixed delay; alerts raised while disconnected are not replayed.

mod notification;
mod sse;
mod stream;

pub use notification::{Notification, NotificationSink, NotificationVariant};
pub use sse::{SseDecoder, SseEvent};
pub use stream::{
    ANOMALY_ALERT_EVENT, AlertStream, AlertStreamConfig, AlertStreamSnapshot, AlertStreamStatus,
};
