//! Landing page summary
//!
//! The three sources load concurrently. A failing source leaves its own
//! figures empty and is reported under `errors`; the rest still render.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use super::anomalies::{self, AnomalyRow};
use super::{PageError, dcp_configs, machines};
use crate::format::HIGH_RISK_THRESHOLD;
use crate::model::{AnomalyHistory, Machine};
use crate::state::AppState;

/// Anomalies listed under "recent"
pub const RECENT_ANOMALIES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_machines: Option<usize>,
    pub active_configs: Option<usize>,
    pub total_anomalies: Option<usize>,
    pub high_risk_anomalies: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub stats: OverviewStats,
    pub recent_anomalies: Vec<AnomalyRow>,
    pub machines: Vec<Machine>,
    /// Section name to error message, for sections that failed to load
    pub errors: BTreeMap<&'static str, String>,
}

pub fn high_risk_count(histories: &[AnomalyHistory]) -> usize {
    histories
        .iter()
        .filter(|h| h.anomaly_probability > HIGH_RISK_THRESHOLD)
        .count()
}

/// The newest `limit` anomalies, newest first
pub fn recent(histories: &[AnomalyHistory], limit: usize) -> Vec<AnomalyRow> {
    let mut sorted: Vec<&AnomalyHistory> = histories.iter().collect();
    sorted.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
    sorted
        .into_iter()
        .take(limit)
        .cloned()
        .map(AnomalyRow::from)
        .collect()
}

fn record(errors: &mut BTreeMap<&'static str, String>, section: &'static str, e: PageError) {
    warn!("Overview section '{}' failed: {}", section, e);
    errors.insert(section, e.to_string());
}

pub async fn load(state: &AppState) -> Overview {
    let (machines, configs, histories) = tokio::join!(
        machines::list(state),
        dcp_configs::configs(state),
        anomalies::all(state),
    );

    let mut overview = Overview::default();

    match machines {
        Ok(machines) => {
            overview.stats.total_machines = Some(machines.len());
            overview.machines = machines;
        }
        Err(e) => record(&mut overview.errors, "machines", e),
    }

    match configs {
        Ok(configs) => overview.stats.active_configs = Some(configs.len()),
        Err(e) => record(&mut overview.errors, "dcpConfigs", e),
    }

    match histories {
        Ok(histories) => {
            overview.stats.total_anomalies = Some(histories.len());
            overview.stats.high_risk_anomalies = Some(high_risk_count(&histories));
            overview.recent_anomalies = recent(&histories, RECENT_ANOMALIES);
        }
        Err(e) => record(&mut overview.errors, "anomalies", e),
    }

    overview
}
