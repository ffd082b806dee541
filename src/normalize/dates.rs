//! Date-time parsing for date-like columns
//!
//! Values are parsed leniently and rendered in one canonical form,
//! `YYYY-MM-DDTHH:MM:SS[.fraction]`, always in UTC.

use crate::types::JsonValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// chrono format of the canonical representation
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y"];

/// Parse a date or date-time string
///
/// Accepts RFC 3339, RFC 2822, ISO-like naive forms, plain dates, and the
/// `07 Jun 2019 00:00:00 GMT` form found in Bandcamp exports. Offsets are
/// converted to UTC.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }

    let naive = s
        .strip_suffix(" GMT")
        .or_else(|| s.strip_suffix(" UTC"))
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s);

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Parse a JSON cell into a date-time
///
/// Numbers are taken as Unix seconds. Anything unparsable is `None`.
pub fn parse_datetime_value(value: &JsonValue) -> Option<NaiveDateTime> {
    match value {
        JsonValue::String(s) => parse_datetime(s),
        JsonValue::Number(n) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
        }
        _ => None,
    }
}

/// Render a date-time in canonical form
pub fn format_canonical(dt: &NaiveDateTime) -> String {
    dt.format(CANONICAL_FORMAT).to_string()
}

/// Canonicalize one cell: a canonical string, or `null` when it cannot be parsed
pub fn canonicalize(value: &JsonValue) -> JsonValue {
    parse_datetime_value(value)
        .map_or(JsonValue::Null, |dt| JsonValue::String(format_canonical(&dt)))
}
