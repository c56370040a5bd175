use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Renders an instant as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_iso8601(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts platform epoch seconds into a UTC instant, `None` when out of range.
pub fn unix_seconds_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// Calendar day (`YYYY-MM-DD`, UTC) used as the bucket for daily aggregates.
pub fn utc_day_key(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}
