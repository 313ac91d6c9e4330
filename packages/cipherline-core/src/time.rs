//! Time helpers.
//!
//! Wire timestamps are ISO-8601 strings in UTC with millisecond precision,
//! the same shape `Date.prototype.toISOString()` produces
//! (`2025-01-01T00:00:00.000Z`).

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Returns the current time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Formats a time as a wire timestamp.
pub fn to_iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current time as a wire timestamp.
pub fn now_iso8601() -> String {
    to_iso8601(&Utc::now())
}

/// Parses a wire timestamp.
///
/// Any RFC 3339 offset is accepted and normalized to UTC.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("Invalid ISO-8601 timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_timestamp_is_reasonable() {
        let ts = now_timestamp();
        // Should be after 2024-01-01 (1704067200)
        assert!(ts > 1704067200, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01 (4102444800)
        assert!(ts < 4102444800, "Timestamp {} is too far in future", ts);
    }

    #[test]
    fn test_iso8601_matches_javascript_shape() {
        let time = Utc
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .unwrap();
        assert_eq!(to_iso8601(&time), "2025-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_parse_round_trips() {
        let text = now_iso8601();
        let parsed = parse_iso8601(&text).unwrap();
        assert_eq!(to_iso8601(&parsed), text);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_iso8601("yesterday"),
            Err(Error::Validation(_))
        ));
    }
}
