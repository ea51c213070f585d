//! Page modules
//!
//! Each page loads through the shared [`QueryCache`](crate::cache::QueryCache),
//! validates mutations before they reach upstream and invalidates its
//! resource prefix after a successful write.

pub mod anomalies;
pub mod dcp_configs;
pub mod machines;
pub mod overview;
pub mod sensor_data;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::client::ClientError;
use crate::format::{parse_date_time, wire_date_time};
use crate::pagination::PaginationError;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Upstream(#[from] ClientError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// A query whose required inputs are missing is never sent upstream.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid date range: {0}")]
    InvalidRange(String),
}

pub type PageResult<T> = Result<T, PageError>;

/// Inclusive local date-time range, normalised to the upstream wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    fn parse_bound(name: &str, raw: &str) -> PageResult<NaiveDateTime> {
        parse_date_time(raw)
            .ok_or_else(|| PageError::InvalidRange(format!("{name} is not a date-time: {raw}")))
    }

    /// Both bounds present, or the query stays disabled.
    pub fn required(start: Option<&str>, end: Option<&str>) -> PageResult<Self> {
        let start = non_empty(start).ok_or(PageError::MissingParameter("start"))?;
        let end = non_empty(end).ok_or(PageError::MissingParameter("end"))?;
        Self::from_bounds(start, end)
    }

    /// `None` when neither bound is given; one bound alone is an error.
    pub fn optional(start: Option<&str>, end: Option<&str>) -> PageResult<Option<Self>> {
        match (non_empty(start), non_empty(end)) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::from_bounds(start, end).map(Some),
            (None, Some(_)) => Err(PageError::MissingParameter("start")),
            (Some(_), None) => Err(PageError::MissingParameter("end")),
        }
    }

    fn from_bounds(start: &str, end: &str) -> PageResult<Self> {
        let start = Self::parse_bound("start", start)?;
        let end = Self::parse_bound("end", end)?;
        if start > end {
            return Err(PageError::InvalidRange("start is after end".to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn start_param(&self) -> String {
        wire_date_time(&self.start)
    }

    pub fn end_param(&self) -> String {
        wire_date_time(&self.end)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_range() {
        let range = DateRange::required(Some("2024-05-01T00:00"), Some("2024-05-02T00:00")).unwrap();
        assert_eq!(range.start_param(), "2024-05-01T00:00:00");
        assert_eq!(range.end_param(), "2024-05-02T00:00:00");

        assert!(matches!(
            DateRange::required(None, Some("2024-05-02T00:00")),
            Err(PageError::MissingParameter("start"))
        ));
        assert!(matches!(
            DateRange::required(Some("2024-05-01T00:00"), Some("  ")),
            Err(PageError::MissingParameter("end"))
        ));
    }

    #[test]
    fn test_optional_range() {
        assert_eq!(DateRange::optional(None, Some("")).unwrap(), None);
        assert!(DateRange::optional(Some("2024-05-01T00:00"), None).is_err());
        assert!(DateRange::optional(Some("2024-05-01T00:00"), Some("2024-05-01T00:00")).unwrap().is_some());
    }

    #[test]
    fn test_reversed_or_garbled_range() {
        assert!(matches!(
            DateRange::required(Some("2024-05-02T00:00"), Some("2024-05-01T00:00")),
            Err(PageError::InvalidRange(_))
        ));
        assert!(matches!(
            DateRange::required(Some("tomorrow"), Some("2024-05-01T00:00")),
            Err(PageError::InvalidRange(_))
        ));
    }
}
