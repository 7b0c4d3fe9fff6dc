//! Multi-format timestamp parsing at the wire boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Naive formats accepted from remote payloads; interpreted as UTC.
static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Epoch values at or above this magnitude are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Parse a timestamp in any accepted format into canonical UTC.
///
/// Accepts RFC3339 with offset, naive date-times, bare dates (midnight),
/// and epoch seconds or milliseconds. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    if let Ok(epoch) = trimmed.parse::<i64>() {
        let (secs, millis) = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
            (epoch.div_euclid(1000), epoch.rem_euclid(1000))
        } else {
            (epoch, 0)
        };
        return DateTime::from_timestamp(secs, millis as u32 * 1_000_000);
    }

    None
}
