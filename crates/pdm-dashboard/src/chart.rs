//! Time-series preparation for the sensor charts
//!
//! Each channel becomes an aligned pair of unix-second timestamps and values
//! that the browser plots directly.

use serde::Serialize;

use crate::model::{SensorChannel, SensorReading};

/// Point markers are drawn only for short series
const POINT_MARKER_LIMIT: usize = 100;

/// One plotted channel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub channel: SensorChannel,
    pub title: &'static str,
    pub unit: &'static str,
    pub color: &'static str,
    pub axis_label: String,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
    pub show_points: bool,
}

/// All charts of one sensor-data query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSet {
    pub machine_id: i64,
    pub source_points: usize,
    pub series: Vec<ChartSeries>,
}

pub fn format_tick(value: f64) -> String {
    format!("{value:.2}")
}

/// Build one series per channel, downsampled to `max_points` when given.
pub fn build_charts(
    machine_id: i64,
    readings: &[SensorReading],
    max_points: Option<usize>,
) -> ChartSet {
    let timestamps: Vec<i64> = readings
        .iter()
        .map(|r| r.created_at.and_utc().timestamp())
        .collect();
    let show_points = readings.len() < POINT_MARKER_LIMIT;

    let series = SensorChannel::ALL
        .iter()
        .map(|&channel| {
            let values: Vec<f64> = readings.iter().map(|r| r.value(channel)).collect();
            let (timestamps, values) = match max_points {
                Some(max) => downsample(&timestamps, &values, max),
                None => (timestamps.clone(), values),
            };
            ChartSeries {
                channel,
                title: channel.title(),
                unit: channel.unit(),
                color: channel.color(),
                axis_label: format!("{} ({})", channel.title(), channel.unit()),
                timestamps,
                values,
                show_points,
            }
        })
        .collect();

    ChartSet {
        machine_id,
        source_points: readings.len(),
        series,
    }
}

/// Reduce a series to at most `max_points` by averaging equal-width buckets.
///
/// The first and last samples are kept whenever the limit allows two or
/// more points. A limit of one yields the mean of the whole series.
pub fn downsample(timestamps: &[i64], values: &[f64], max_points: usize) -> (Vec<i64>, Vec<f64>) {
    let len = timestamps.len().min(values.len());
    if len <= max_points {
        return (timestamps[..len].to_vec(), values[..len].to_vec());
    }
    match max_points {
        0 => return (Vec::new(), Vec::new()),
        1 => {
            let n = len as f64;
            let ts_mean = timestamps[..len].iter().map(|&t| t as f64).sum::<f64>() / n;
            let val_mean = values[..len].iter().sum::<f64>() / n;
            return (vec![ts_mean.round() as i64], vec![val_mean]);
        }
        2 => {
            return (
                vec![timestamps[0], timestamps[len - 1]],
                vec![values[0], values[len - 1]],
            );
        }
        _ => {}
    }

    let buckets = max_points - 2;
    let interior = len - 2;
    let mut out_ts = Vec::with_capacity(max_points);
    let mut out_vals = Vec::with_capacity(max_points);

    out_ts.push(timestamps[0]);
    out_vals.push(values[0]);

    for bucket in 0..buckets {
        let from = 1 + bucket * interior / buckets;
        let to = 1 + (bucket + 1) * interior / buckets;
        if from == to {
            continue;
        }
        let n = (to - from) as f64;
        let ts_mean = timestamps[from..to].iter().map(|&t| t as f64).sum::<f64>() / n;
        let val_mean = values[from..to].iter().sum::<f64>() / n;
        out_ts.push(ts_mean.round() as i64);
        out_vals.push(val_mean);
    }

    out_ts.push(timestamps[len - 1]);
    out_vals.push(values[len - 1]);
    (out_ts, out_vals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn reading(id: i64, at: &str) -> SensorReading {
        SensorReading {
            id,
            machine_id: 1,
            air_temperature: id as f64,
            process_temperature: 300.0,
            rotational_speed: 1500.0,
            torque: 40.0,
            tool_wear: 10.0,
            created_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S").unwrap(),
        }
    }

    #[test]
    fn test_one_series_per_channel() {
        let readings = vec![reading(1, "2024-05-01T00:00:00"), reading(2, "2024-05-01T00:01:00")];
        let charts = build_charts(1, &readings, None);

        assert_eq!(charts.series.len(), 5);
        let air = &charts.series[0];
        assert_eq!(air.axis_label, "Air Temperature (°C)");
        assert_eq!(air.timestamps, vec![1714521600, 1714521660]);
        assert_eq!(air.values, vec![1.0, 2.0]);
        assert!(air.show_points);
    }

    #[test]
    fn test_points_hidden_for_long_series() {
        let readings: Vec<SensorReading> = (0..100)
            .map(|i| reading(i, "2024-05-01T00:00:00"))
            .collect();
        let charts = build_charts(1, &readings, None);
        assert!(!charts.series[0].show_points);
    }

    #[test]
    fn test_downsample_keeps_endpoints() {
        let ts: Vec<i64> = (0..1000).collect();
        let vals: Vec<f64> = (0..1000).map(|v| v as f64).collect();

        let (out_ts, out_vals) = downsample(&ts, &vals, 10);

        assert_eq!(out_ts.len(), 10);
        assert_eq!(out_vals.len(), 10);
        assert_eq!(out_ts.first(), Some(&0));
        assert_eq!(out_ts.last(), Some(&999));
        assert!(out_ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_downsample_short_series_untouched() {
        let (ts, vals) = downsample(&[1, 2, 3], &[1.0, 2.0, 3.0], 10);
        assert_eq!(ts, vec![1, 2, 3]);
        assert_eq!(vals, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_downsample_tiny_limits() {
        let ts: Vec<i64> = (0..50).collect();
        let vals: Vec<f64> = (0..50).map(|v| v as f64).collect();

        assert_eq!(downsample(&ts, &vals, 2), (vec![0, 49], vec![0.0, 49.0]));
        assert_eq!(downsample(&ts, &vals, 1), (vec![25], vec![24.5]));
        assert_eq!(downsample(&ts, &vals, 0), (vec![], vec![]));
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(1551.0), "1551.00");
        assert_eq!(format_tick(42.857), "42.86");
    }
}
