//! Sensor data page: table, charts and CSV export over one machine and range

use serde::Serialize;
use tracing::debug;

use super::{DateRange, PageError, PageResult};
use crate::cache::keys;
use crate::chart::{ChartSet, build_charts};
use crate::export::{export_filename, sensor_csv};
use crate::format::display_date_time;
use crate::model::SensorReading;
use crate::pagination::{PageRequest, Paginated, paginate};
use crate::state::AppState;

/// Machine and range selection; nothing is fetched until all three are set
#[derive(Debug, Clone, Default)]
pub struct SensorQuery<'a> {
    pub machine_id: Option<i64>,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
}

impl SensorQuery<'_> {
    fn resolve(&self) -> PageResult<(i64, DateRange)> {
        let machine_id = self
            .machine_id
            .filter(|id| *id > 0)
            .ok_or(PageError::MissingParameter("machineId"))?;
        Ok((machine_id, DateRange::required(self.start, self.end)?))
    }
}

/// Table row with the timestamp in display form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRow {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub created_at_display: String,
}

impl From<SensorReading> for SensorRow {
    fn from(reading: SensorReading) -> Self {
        let created_at_display = display_date_time(&reading.created_at);
        Self {
            reading,
            created_at_display,
        }
    }
}

/// CSV download ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

async fn readings(state: &AppState, query: &SensorQuery<'_>) -> PageResult<(i64, Vec<SensorReading>)> {
    let (machine_id, range) = query.resolve()?;
    let (start, end) = (range.start_param(), range.end_param());
    let portal = &state.portal;
    let key = keys::sensor_data(machine_id, &start, &end);
    let readings = state
        .cache
        .fetch(key, || portal.sensor_data(machine_id, &start, &end))
        .await?;
    debug!(machine_id, count = readings.len(), "Sensor readings loaded");
    Ok((machine_id, readings))
}

pub async fn table(
    state: &AppState,
    query: &SensorQuery<'_>,
    page: PageRequest,
) -> PageResult<Paginated<SensorRow>> {
    let (_, readings) = readings(state, query).await?;
    Ok(paginate(readings, page)?.map(SensorRow::from))
}

pub async fn charts(
    state: &AppState,
    query: &SensorQuery<'_>,
    max_points: Option<usize>,
) -> PageResult<ChartSet> {
    let (machine_id, readings) = readings(state, query).await?;
    Ok(build_charts(machine_id, &readings, max_points))
}

/// `None` when the range holds no readings.
pub async fn export(
    state: &AppState,
    query: &SensorQuery<'_>,
    epoch_millis: i64,
) -> PageResult<Option<CsvExport>> {
    let (machine_id, readings) = readings(state, query).await?;
    Ok(sensor_csv(&readings).map(|body| CsvExport {
        filename: export_filename(machine_id, epoch_millis),
        body,
    }))
}
