//! Human-readable pair age ("3y", "5m", "12d", "4h", "30m", "9s").
//!
//! Only the single coarsest unit is reported. Years are 365 days and months
//! are 30 days. Minutes and months share the `m` suffix; a month can never be
//! mistaken for minutes in practice because minutes only appear for ages under
//! one hour.

use chrono::{DateTime, TimeZone, Utc};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Format the age of something created at `created_at_ms` as seen at `now`.
///
/// Returns `None` when the timestamp is not representable. A creation time in
/// the future reports `0s`.
pub fn format_age(created_at_ms: i64, now: DateTime<Utc>) -> Option<String> {
    let created = Utc.timestamp_millis_opt(created_at_ms).single()?;
    let elapsed = now.signed_duration_since(created).num_seconds().max(0);

    let days = elapsed / SECS_PER_DAY;
    let years = days / DAYS_PER_YEAR;
    let months = days / DAYS_PER_MONTH;

    let label = if years > 0 {
        format!("{}y", years)
    } else if months > 0 {
        format!("{}m", months)
    } else if days > 0 {
        format!("{}d", days)
    } else {
        let seconds = elapsed % SECS_PER_DAY;
        let hours = seconds / SECS_PER_HOUR;
        let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
        if hours > 0 {
            format!("{}h", hours)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", seconds)
        }
    };

    Some(label)
}

/// Convenience wrapper for an optional timestamp.
pub fn age_since(created_at_ms: Option<i64>, now: DateTime<Utc>) -> Option<String> {
    created_at_ms.and_then(|ms| format_age(ms, now))
}
