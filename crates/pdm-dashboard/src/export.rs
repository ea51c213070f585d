//! CSV export of sensor readings

use crate::format::wire_date_time;
use crate::model::SensorReading;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

const CSV_HEADER: [&str; 8] = [
    "ID",
    "Machine ID",
    "Air Temperature",
    "Process Temperature",
    "Rotational Speed",
    "Torque",
    "Tool Wear",
    "Created At",
];

/// Render readings as CSV, or `None` when there is nothing to export.
///
/// Rows are joined with `\n` and carry no trailing newline.
pub fn sensor_csv(readings: &[SensorReading]) -> Option<String> {
    if readings.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(readings.len() + 1);
    lines.push(CSV_HEADER.join(","));
    lines.extend(readings.iter().map(|r| {
        [
            r.id.to_string(),
            r.machine_id.to_string(),
            r.air_temperature.to_string(),
            r.process_temperature.to_string(),
            r.rotational_speed.to_string(),
            r.torque.to_string(),
            r.tool_wear.to_string(),
            wire_date_time(&r.created_at),
        ]
        .join(",")
    }));
    Some(lines.join("\n"))
}

pub fn export_filename(machine_id: i64, epoch_millis: i64) -> String {
    format!("sensor-data-machine-{machine_id}-{epoch_millis}.csv")
}
