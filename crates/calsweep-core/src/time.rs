//! Timestamp parsing and date-only coercion.
//!
//! Calendar APIs hand back two shapes of time: a full RFC 3339 timestamp for
//! timed events and a bare `YYYY-MM-DD` date for all-day events. Rows carry a
//! single column type, so dates are pinned to [`DEFAULT_TIME_OF_DAY`] in UTC.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

/// Time of day assigned to date-only values (midnight).
pub const DEFAULT_TIME_OF_DAY: NaiveTime = NaiveTime::MIN;

/// Error returned when a user-supplied time bound cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time bound '{input}': expected RFC 3339 timestamp or YYYY-MM-DD date")]
pub struct TimeParseError {
    input: String,
}

impl TimeParseError {
    /// Returns the rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Pins a date to [`DEFAULT_TIME_OF_DAY`] in UTC.
pub fn date_at_default_time(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(DEFAULT_TIME_OF_DAY).and_utc()
}

/// Parses an RFC 3339 timestamp and converts it to UTC.
///
/// Returns `None` for anything that is not a valid timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses a lower/upper time bound given on the command line or in config.
///
/// Accepts either a full RFC 3339 timestamp or a plain date, which is pinned
/// to the default time of day.
pub fn parse_time_bound(value: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_timestamp(value)
        .or_else(|| parse_date(value).map(date_at_default_time))
        .ok_or_else(|| TimeParseError {
            input: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_is_pinned_to_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            date_at_default_time(date),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn timestamp_with_offset_converts_to_utc() {
        let parsed = parse_timestamp("2024-03-15T10:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-03-15").is_none());
    }

    #[test]
    fn date_rejects_timestamps() {
        assert!(parse_date("2024-03-15T10:00:00Z").is_none());
        assert_eq!(
            parse_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn time_bound_accepts_both_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_time_bound("2024-01-01T00:00:00Z"), Ok(expected));
        assert_eq!(parse_time_bound("2024-01-01"), Ok(expected));
    }

    #[test]
    fn time_bound_error_keeps_input() {
        let err = parse_time_bound("next tuesday").unwrap_err();
        assert_eq!(err.input(), "next tuesday");
        assert!(err.to_string().contains("RFC 3339"));
    }
}
