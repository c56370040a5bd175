//! Foundational low-level utilities shared across guildpulse crates.
//!
//! Provides clock helpers, ISO-8601 rendering and UTC day keys used by fact
//! serialization and aggregate storage, plus error-text truncation for
//! transport diagnostics.

pub mod text_utils;
pub mod time_utils;

pub use text_utils::truncate_for_error;
pub use time_utils::{
    current_unix_timestamp_ms, format_iso8601, unix_seconds_to_utc, utc_day_key,
};
