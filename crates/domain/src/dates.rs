//! Date resolution for loosely-typed stored values
//!
//! Stored documents carry dates as Mongo extended-JSON objects, epoch numbers
//! (seconds or milliseconds) and a handful of string formats. Everything here
//! resolves to `Option<OffsetDateTime>`; `None` means "unresolved" and must be
//! treated as missing data by callers.

use serde_json::Value;
use std::sync::LazyLock;
use time::format_description::OwnedFormatItem;
use time::format_description::well_known::{Iso8601, Rfc2822, Rfc3339};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Numbers below this are epoch seconds, at or above it epoch milliseconds.
///
/// 13-digit values are milliseconds. Realistic Reddit timestamps sit far from
/// the boundary in either unit.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

/// Label used whenever no date can be resolved
pub const UNKNOWN_DATE: &str = "Unknown date";

static NAIVE_DATE_TIME_FORMATS: LazyLock<Vec<OwnedFormatItem>> = LazyLock::new(|| {
    [
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day]T[hour]:[minute]:[second]",
        "[year]-[month]-[day]T[hour]:[minute]",
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day] [hour]:[minute]:[second]",
        "[year]-[month]-[day] [hour]:[minute]",
    ]
    .iter()
    .filter_map(|description| time::format_description::parse_owned::<1>(description).ok())
    .collect()
});

static DATE_ONLY_FORMAT: LazyLock<Option<OwnedFormatItem>> =
    LazyLock::new(|| time::format_description::parse_owned::<1>("[year]-[month]-[day]").ok());

/// Resolve a value of unknown shape into an instant
pub fn resolve_instant(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch_number),
        Value::String(s) => parse_date_string(s),
        Value::Object(map) => map.get("$date").and_then(resolve_extended_date),
        _ => None,
    }
}

/// Mongo extended JSON: `{"$date": "..."}`, `{"$date": 1704...}` or
/// `{"$date": {"$numberLong": "1704..."}}`. Numeric forms are always millis.
fn resolve_extended_date(inner: &Value) -> Option<OffsetDateTime> {
    match inner {
        Value::String(s) => parse_date_string(s),
        Value::Number(n) => n.as_f64().and_then(from_epoch_millis),
        Value::Object(map) => map
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|millis| from_epoch_millis(millis as f64)),
        _ => None,
    }
}

/// Interpret an epoch number, guessing the unit from its magnitude
pub fn from_epoch_number(value: f64) -> Option<OffsetDateTime> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    if value < EPOCH_MILLIS_THRESHOLD {
        from_epoch_millis(value * 1000.0)
    } else {
        from_epoch_millis(value)
    }
}

fn from_epoch_millis(millis: f64) -> Option<OffsetDateTime> {
    if !millis.is_finite() || millis <= 0.0 {
        return None;
    }

    let nanos = (millis.trunc() as i128).checked_mul(1_000_000)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

/// Parse a calendar/time string. Strings without an offset are taken as UTC.
pub fn parse_date_string(raw: &str) -> Option<OffsetDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(parsed);
    }

    if let Ok(parsed) = OffsetDateTime::parse(s, &Iso8601::DEFAULT) {
        return Some(parsed);
    }

    for format in NAIVE_DATE_TIME_FORMATS.iter() {
        if let Ok(parsed) = PrimitiveDateTime::parse(s, format) {
            return Some(parsed.assume_utc());
        }
    }

    if let Some(format) = DATE_ONLY_FORMAT.as_ref() {
        if let Ok(date) = Date::parse(s, format) {
            return Some(start_of_day(date));
        }
    }

    OffsetDateTime::parse(s, &Rfc2822).ok()
}

/// `YYYY-MM-DD` in UTC
pub fn day_label(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}",
        utc.year(),
        u8::from(utc.month()),
        utc.day()
    )
}

/// `YYYY-MM-DDTHH:00:00Z` in UTC
pub fn hour_label(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:00:00Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour()
    )
}

/// `MM/DD/YYYY` for list views
pub fn display_date(date: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        u8::from(date.month()),
        date.day(),
        date.year()
    )
}

/// UTC calendar date of an instant
pub fn utc_date(instant: OffsetDateTime) -> Date {
    instant.to_offset(UtcOffset::UTC).date()
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

/// Last representable instant of `date` in UTC
pub fn end_of_day(date: Date) -> OffsetDateTime {
    match date.next_day() {
        Some(next) => start_of_day(next) - Duration::NANOSECOND,
        None => PrimitiveDateTime::MAX.assume_utc(),
    }
}

/// Truncate to the containing UTC hour
pub fn start_of_hour(instant: OffsetDateTime) -> OffsetDateTime {
    let utc = instant.to_offset(UtcOffset::UTC);
    let hour = Time::from_hms(utc.hour(), 0, 0).unwrap_or(Time::MIDNIGHT);
    utc.date().with_time(hour).assume_utc()
}
