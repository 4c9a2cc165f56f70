//! Timestamp and calendar parsing utilities
//!
//! Payload dates are literal `YYYY-MM-DD` strings; clock times and
//! durations are `HH:MM:SS` (seconds optional on input).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a `YYYY-MM-DD` date, naming `field` in the error
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidFormat(format!("{} must be a YYYY-MM-DD date, got '{}'", field, value))
    })
}

/// Parse an optional date field; empty strings count as absent
pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

/// Parse an `HH:MM:SS` or `HH:MM` clock time / duration
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            Error::InvalidFormat(format!("{} must be an HH:MM:SS time, got '{}'", field, value))
        })
}

/// Parse an optional time field; empty strings count as absent
pub fn parse_optional_time(field: &str, value: Option<&str>) -> Result<Option<NaiveTime>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_time(field, v).map(Some),
    }
}

/// Default song duration (3:30)
pub fn default_song_duration() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 3, 30).unwrap_or(NaiveTime::MIN)
}
