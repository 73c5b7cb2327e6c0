//! Common utilities shared across modules.
//!
//! Time handling lives here so every table stores timestamps the same way:
//! RFC 3339 in UTC with microsecond precision, which keeps the text columns
//! ordered lexicographically and lets range queries compare strings.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use std::path::PathBuf;

/// Gets the application data directory following the XDG base directory layout.
///
/// Returns `~/.local/share/workpulse/` on Unix-like systems.
///
/// # Example
///
/// ```rust,no_run
/// use workpulse::common::get_data_dir;
///
/// let db_path = get_data_dir().join("workpulse.db");
/// ```
pub fn get_data_dir() -> PathBuf {
    let base_dir = dirs::data_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local").join("share")
    });

    base_dir.join("workpulse")
}

/// Formats a timestamp for storage.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use workpulse::common::format_timestamp;
///
/// let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
/// assert_eq!(format_timestamp(&ts), "2024-03-01T09:00:00.000000Z");
/// ```
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Formats a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Half-open UTC bounds `[start, end)` of a calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    (start, start + Duration::days(1))
}

/// Start of the UTC day containing `ts`.
pub fn start_of_day(ts: &DateTime<Utc>) -> DateTime<Utc> {
    day_bounds(ts.date_naive()).0
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.to_string_lossy().contains("workpulse"));
    }

    #[test]
    fn test_timestamp_round_trip_keeps_micros() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 15).unwrap()
            + Duration::microseconds(1234);
        let text = format_timestamp(&ts);
        assert_eq!(parse_timestamp(&text), Some(ts));
    }

    #[test]
    fn test_parse_timestamp_normalizes_offsets() {
        let parsed = parse_timestamp("2024-03-01T11:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_stored_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_helpers() {
        let date = parse_date("2024-12-31").unwrap();
        assert_eq!(format_date(&date), "2024-12-31");
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }
}
