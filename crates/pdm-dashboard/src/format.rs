//! Display formatting for timestamps and probabilities

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format used by date-time inputs (`YYYY-MM-DDTHH:MM`)
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Probability above which an anomaly counts as high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
const MEDIUM_RISK_THRESHOLD: f64 = 0.5;

/// Parse the date-time shapes the upstream services and input fields produce.
///
/// Offsets are dropped in favour of the wall-clock time they carry.
pub fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", INPUT_FORMAT, "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// `yyyy-MM-dd HH:mm:ss`, or the input unchanged when it does not parse
pub fn format_date_time(s: &str) -> String {
    parse_date_time(s)
        .map(|dt| dt.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_else(|| s.to_string())
}

/// `yyyy-MM-dd`, or the input unchanged when it does not parse
pub fn format_date(s: &str) -> String {
    parse_date_time(s)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| s.to_string())
}

pub fn display_date_time(dt: &NaiveDateTime) -> String {
    dt.format(DATE_TIME_FORMAT).to_string()
}

/// Upstream representation (`2024-05-01T12:30:00`), fraction kept when present
pub fn wire_date_time(dt: &NaiveDateTime) -> String {
    dt.format(WIRE_FORMAT).to_string()
}

pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Risk band used to colour probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityBand {
    High,
    Medium,
    Low,
}

impl ProbabilityBand {
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            ProbabilityBand::High
        } else if probability > MEDIUM_RISK_THRESHOLD {
            ProbabilityBand::Medium
        } else {
            ProbabilityBand::Low
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ProbabilityBand::High => "prob-high",
            ProbabilityBand::Medium => "prob-medium",
            ProbabilityBand::Low => "prob-low",
        }
    }
}

/// Serde adapter for upstream local date-times
pub mod iso_local {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::wire_date_time(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_date_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date-time: {raw}")))
    }
}
