//! Timestamp resolution for canonical messages.
//!
//! Capture timestamps are Unix epoch seconds carried as JSON strings or
//! numbers. No other date format is attempted at build time; a value that is
//! not an integer epoch yields no timestamp and no year, and the loss of
//! ordering precision is accepted downstream.

use chrono::{DateTime, Datelike, LocalResult, TimeZone, Utc};

/// Convert an epoch-seconds value into `(ISO-8601 UTC string, year)`.
///
/// Returns `(None, None)` when the value does not parse as an integer or
/// falls outside the representable range. The ISO form carries a trailing
/// `Z` and second precision.
pub fn epoch_to_iso_year(value: &str) -> (Option<String>, Option<i32>) {
    let Ok(secs) = value.trim().parse::<i64>() else {
        return (None, None);
    };
    match Utc.timestamp_opt(secs, 0) {
        LocalResult::Single(dt) => (
            Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            Some(dt.year()),
        ),
        _ => (None, None),
    }
}

/// Parse a corpus timestamp (as produced by [`epoch_to_iso_year`]) back into
/// a `DateTime<Utc>`. Accepts any RFC 3339 form.
pub fn parse_iso(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
