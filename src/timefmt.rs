// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Timestamp and duration formatting helpers

use chrono::{DateTime, NaiveDate, Utc};

/// Format used by [`format_timestamp`]
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Seconds since the Unix epoch, with sub-second precision
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Format epoch seconds as a UTC timestamp (`20210101 00:00:00`).
///
/// Values outside chrono's range are returned as plain seconds.
pub fn format_timestamp(epoch_seconds: f64) -> String {
    let secs = epoch_seconds.floor();
    let nanos = ((epoch_seconds - secs) * 1e9) as u32;

    match DateTime::<Utc>::from_timestamp(secs as i64, nanos) {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => format!("{}", epoch_seconds),
    }
}

/// Elapsed time between two epoch timestamps, e.g. `1.50s`
pub fn format_duration(start_time: f64, end_time: f64) -> String {
    format!("{:.2}s", end_time - start_time)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_date_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "19700101 00:00:00");
        assert_eq!(format_timestamp(1_609_459_200.75), "20210101 00:00:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(10.0, 11.5), "1.50s");
        assert_eq!(format_duration(3.0, 3.0), "0.00s");
    }

    #[test]
    fn test_parse_date_time() {
        let midnight = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date_time("2021-01-01"), Some(midnight));
        assert_eq!(parse_date_time("2021-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(
            parse_date_time("2021-01-01T02:00:00+02:00"),
            Some(midnight)
        );
        assert_eq!(parse_date_time("yesterday"), None);
    }

    #[test]
    fn test_epoch_now_is_recent() {
        assert!(epoch_now() > 1_600_000_000.0);
    }
}
