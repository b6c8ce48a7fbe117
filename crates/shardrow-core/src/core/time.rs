// crates/shardrow-core/src/core/time.rs
// ============================================================================
// Module: Shardrow Time Helpers
// Description: Wall-clock capture and conversion for cell revision timestamps.
// Purpose: Keep the stored representation (unix milliseconds) in one place.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Revision timestamps are captured at write time and carried in-process as
//! unix epoch milliseconds. Storage writes them as RFC 3339 UTC text unless
//! the legacy-compat configuration flag selects the integer millisecond
//! representation; reads accept either form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Captures the current wall-clock time as unix epoch milliseconds.
#[must_use]
pub fn unix_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

/// Converts unix epoch milliseconds to a UTC datetime.
#[must_use]
pub fn to_datetime(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Formats unix epoch milliseconds as RFC 3339 UTC text.
#[must_use]
pub fn to_rfc3339(millis: i64) -> Option<String> {
    to_datetime(millis)?.format(&Rfc3339).ok()
}

/// Parses RFC 3339 text back to unix epoch milliseconds.
#[must_use]
pub fn from_rfc3339(text: &str) -> Option<i64> {
    let datetime = OffsetDateTime::parse(text, &Rfc3339).ok()?;
    i64::try_from(datetime.unix_timestamp_nanos() / 1_000_000).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn converts_millis_to_utc() {
        let datetime = to_datetime(0).unwrap();
        assert_eq!(datetime.unix_timestamp(), 0);
        let datetime = to_datetime(1_500).unwrap();
        assert_eq!(datetime.unix_timestamp(), 1);
    }

    #[test]
    fn now_is_positive() {
        assert!(unix_millis_now() > 0);
    }

    #[test]
    fn rfc3339_text_round_trips_millis() {
        let millis = 1_700_000_000_123_i64;
        let text = to_rfc3339(millis).unwrap();
        assert!(text.ends_with('Z'));
        assert_eq!(from_rfc3339(&text), Some(millis));
    }

    #[test]
    fn malformed_rfc3339_text_is_rejected() {
        assert_eq!(from_rfc3339("not a timestamp"), None);
        assert_eq!(from_rfc3339("1700000000123"), None);
    }
}
