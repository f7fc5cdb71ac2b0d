//! Timezone-aware calendar date resolution
//!
//! Converts an epoch instant plus a timezone specifier into a `YYYY-MM-DD`
//! string through three degrading strategies: IANA zone rules, a fixed
//! `(GMT|UTC)[+-]H[:MM]` offset, and finally plain UTC. Never fails.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolve the calendar date of `timestamp_millis` in `timezone`.
///
/// Always returns a valid ISO date string, degrading to the UTC calendar
/// date when the specifier cannot be interpreted.
pub fn resolve_date(timestamp_millis: i64, timezone: &str) -> String {
    let instant = match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(instant) => instant,
        None => {
            warn!(timestamp_millis, "Timestamp out of range, using current time");
            Utc::now()
        }
    };

    // 1. Full calendar-aware IANA zone rules
    if let Ok(tz) = timezone.trim().parse::<Tz>() {
        return instant.with_timezone(&tz).format(DATE_FORMAT).to_string();
    }

    // 2. Fixed UTC offset of the form (GMT|UTC)[+-]H[:MM]
    if let Some(offset) = parse_fixed_offset(timezone) {
        return instant.with_timezone(&offset).format(DATE_FORMAT).to_string();
    }

    // 3. Plain UTC
    warn!(timezone, "Unresolvable timezone specifier, using UTC date");
    instant.format(DATE_FORMAT).to_string()
}

fn parse_fixed_offset(spec: &str) -> Option<FixedOffset> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^(?:GMT|UTC)([+-])(\d{1,2})(?::(\d{2}))?$").expect("offset pattern must compile")
    });

    let caps = pattern.captures(spec.trim())?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let mut seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        seconds = -seconds;
    }

    FixedOffset::east_opt(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-17T20:00:00Z
    const EVENING_UTC: i64 = 1_710_705_600_000;

    #[test]
    fn test_iana_zone_shifts_across_midnight() {
        assert_eq!(resolve_date(EVENING_UTC, "Asia/Jakarta"), "2024-03-18");
        assert_eq!(resolve_date(EVENING_UTC, "UTC"), "2024-03-17");
    }

    #[test]
    fn test_fixed_offset_variants_agree() {
        assert_eq!(
            resolve_date(EVENING_UTC, "UTC+7"),
            resolve_date(EVENING_UTC, "GMT+07:00")
        );
        assert_eq!(resolve_date(EVENING_UTC, "UTC+7"), "2024-03-18");
    }

    #[test]
    fn test_negative_offset() {
        // 2024-01-01T01:30:00Z is still New Year's Eve at UTC-5
        assert_eq!(resolve_date(1_704_072_600_000, "UTC-5"), "2023-12-31");
    }

    #[test]
    fn test_zero_offset_matches_literal_utc() {
        assert_eq!(
            resolve_date(EVENING_UTC, "UTC+0"),
            resolve_date(EVENING_UTC, "UTC")
        );
    }

    #[test]
    fn test_unresolvable_zone_falls_back_to_utc() {
        assert_eq!(resolve_date(EVENING_UTC, "Mars/Phobos"), "2024-03-17");
    }

    #[test]
    fn test_stable_for_same_inputs() {
        let first = resolve_date(EVENING_UTC, "Asia/Jakarta");
        let second = resolve_date(EVENING_UTC, "Asia/Jakarta");
        assert_eq!(first, second);
    }
}
