//! Wire types shared with the portal and AI services
//!
//! Both upstream services speak camelCase JSON. Timestamps are ISO-8601
//! local date-times without an offset.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine kinds offered when registering a machine.
///
/// The wire field is a free string; values outside this list are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineType {
    Low,
    Medium,
    High,
}

impl MachineType {
    pub const ALL: [MachineType; 3] = [MachineType::Low, MachineType::Medium, MachineType::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Low => "LOW",
            MachineType::Medium => "MEDIUM",
            MachineType::High => "HIGH",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
}

/// Body for registering a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineForm {
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
}

/// Partial update of a machine; absent fields are left untouched upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
}

/// Data-collection (DCP) configuration of a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcpConfig {
    pub id: i64,
    pub machine_id: i64,
    /// Collection interval in seconds
    pub collect_interval: i64,
    pub api_endpoint: String,
}

/// Body for creating or replacing a DCP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcpConfigForm {
    pub machine_id: i64,
    pub collect_interval: i64,
    pub api_endpoint: String,
}

/// One stored sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub machine_id: i64,
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
    #[serde(with = "crate::format::iso_local")]
    pub created_at: NaiveDateTime,
}

impl SensorReading {
    pub fn value(&self, channel: SensorChannel) -> f64 {
        match channel {
            SensorChannel::AirTemperature => self.air_temperature,
            SensorChannel::ProcessTemperature => self.process_temperature,
            SensorChannel::RotationalSpeed => self.rotational_speed,
            SensorChannel::Torque => self.torque,
            SensorChannel::ToolWear => self.tool_wear,
        }
    }
}

/// Sensor values captured together with an anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
}

/// Numeric channels of a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorChannel {
    AirTemperature,
    ProcessTemperature,
    RotationalSpeed,
    Torque,
    ToolWear,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 5] = [
        SensorChannel::AirTemperature,
        SensorChannel::ProcessTemperature,
        SensorChannel::RotationalSpeed,
        SensorChannel::Torque,
        SensorChannel::ToolWear,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SensorChannel::AirTemperature => "Air Temperature",
            SensorChannel::ProcessTemperature => "Process Temperature",
            SensorChannel::RotationalSpeed => "Rotational Speed",
            SensorChannel::Torque => "Torque",
            SensorChannel::ToolWear => "Tool Wear",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorChannel::AirTemperature | SensorChannel::ProcessTemperature => "°C",
            SensorChannel::RotationalSpeed => "RPM",
            SensorChannel::Torque => "Nm",
            SensorChannel::ToolWear => "min",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SensorChannel::AirTemperature => "#3b82f6",
            SensorChannel::ProcessTemperature => "#ef4444",
            SensorChannel::RotationalSpeed => "#10b981",
            SensorChannel::Torque => "#f59e0b",
            SensorChannel::ToolWear => "#8b5cf6",
        }
    }
}

/// Anomaly severity reported by the AI service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Warning,
    Alert,
    Critical,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Other(s) => s,
        }
    }

    /// Human-facing label; unknown severities display verbatim.
    pub fn label(&self) -> &str {
        match self {
            Severity::Warning => "Caution",
            Severity::Alert => "Warning",
            Severity::Critical => "Danger",
            Severity::Other(s) => s,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WARNING" => Severity::Warning,
            "ALERT" => Severity::Alert,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Other(s),
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected anomaly as recorded by the AI service
///
/// The service emits snake_case field names; camelCase is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyHistory {
    pub id: i64,
    #[serde(alias = "machine_id")]
    pub machine_id: i64,
    #[serde(alias = "detected_at", with = "crate::format::iso_local")]
    pub detected_at: NaiveDateTime,
    #[serde(alias = "anomaly_probability")]
    pub anomaly_probability: f64,
    #[serde(alias = "sensor_data")]
    pub event_message_sensor_data: SensorSnapshot,
    pub severity: Severity,
}

/// Payload of an `anomaly-alert` push event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyAlert {
    pub machine_id: i64,
    pub machine_name: String,
    /// Kept as text; rendered through [`crate::format::format_date_time`].
    pub detected_at: String,
    pub severity: Severity,
    pub anomaly_probability: f64,
}
