//! Anomaly history page

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::{DateRange, PageResult};
use crate::cache::keys;
use crate::format::{
    INPUT_FORMAT, ProbabilityBand, display_date_time, format_probability, iso_local,
};
use crate::model::{AnomalyHistory, SensorSnapshot, Severity};
use crate::pagination::{PageRequest, Paginated, paginate};
use crate::state::AppState;

/// Days covered by the pre-filled search form
const DEFAULT_SEARCH_DAYS: i64 = 7;

/// Anomaly as shown in tables
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRow {
    pub id: i64,
    pub machine_id: i64,
    #[serde(with = "iso_local")]
    pub detected_at: NaiveDateTime,
    pub detected_at_display: String,
    pub anomaly_probability: f64,
    pub probability_display: String,
    pub band: ProbabilityBand,
    pub severity: Severity,
    pub severity_label: String,
    pub sensor_data: SensorSnapshot,
}

impl From<AnomalyHistory> for AnomalyRow {
    fn from(history: AnomalyHistory) -> Self {
        Self {
            id: history.id,
            machine_id: history.machine_id,
            detected_at_display: display_date_time(&history.detected_at),
            detected_at: history.detected_at,
            probability_display: format_probability(history.anomaly_probability),
            band: ProbabilityBand::from_probability(history.anomaly_probability),
            anomaly_probability: history.anomaly_probability,
            severity_label: history.severity.label().to_string(),
            severity: history.severity,
            sensor_data: history.event_message_sensor_data,
        }
    }
}

/// Whether a listing covers everything or a searched range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    All,
    Search,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyListing {
    pub mode: ListingMode,
    #[serde(flatten)]
    pub page: Paginated<AnomalyRow>,
}

/// Pre-filled search range: the last seven days up to `now`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchWindow {
    pub start: String,
    pub end: String,
}

pub fn default_search_window(now: NaiveDateTime) -> SearchWindow {
    let start = now - Duration::days(DEFAULT_SEARCH_DAYS);
    SearchWindow {
        start: start.format(INPUT_FORMAT).to_string(),
        end: now.format(INPUT_FORMAT).to_string(),
    }
}

pub(crate) async fn all(state: &AppState) -> PageResult<Vec<AnomalyHistory>> {
    let ai = &state.ai;
    Ok(state
        .cache
        .fetch(keys::anomalies(), move || ai.anomaly_histories())
        .await?)
}

async fn search(state: &AppState, range: &DateRange) -> PageResult<Vec<AnomalyHistory>> {
    let (start, end) = (range.start_param(), range.end_param());
    let ai = &state.ai;
    Ok(state
        .cache
        .fetch(keys::anomaly_search(&start, &end), || {
            ai.search_anomaly_histories(&start, &end)
        })
        .await?)
}

/// Every anomaly, or only those inside `start..=end` when both are given.
pub async fn list(
    state: &AppState,
    start: Option<&str>,
    end: Option<&str>,
    page: PageRequest,
) -> PageResult<AnomalyListing> {
    let (mode, histories) = match DateRange::optional(start, end)? {
        Some(range) => (ListingMode::Search, search(state, &range).await?),
        None => (ListingMode::All, all(state).await?),
    };
    Ok(AnomalyListing {
        mode,
        page: paginate(histories, page)?.map(AnomalyRow::from),
    })
}

/// Anomalies of one machine, newest first
pub async fn for_machine(state: &AppState, machine_id: i64) -> PageResult<Vec<AnomalyRow>> {
    let ai = &state.ai;
    let mut histories = state
        .cache
        .fetch(keys::anomalies().with("machine").with(machine_id), move || {
            ai.machine_anomaly_histories(machine_id)
        })
        .await?;
    histories.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
    Ok(histories.into_iter().map(AnomalyRow::from).collect())
}
