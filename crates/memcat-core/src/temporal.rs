//! # Temporal Helpers
//!
//! Lenient parsing of the date and timestamp attributes the member
//! directory delivers as strings, and age arithmetic in whole years.
//!
//! All parsers return `Option`: an attribute that cannot be parsed makes a
//! rule not match, it never raises an error.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, and RFC 3339 timestamps (the date part, in UTC, is
/// used). Surrounding whitespace is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Parse an instant.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Age in completed years on `on` for someone born on `birth`.
///
/// Returns `None` when `birth` lies after `on`. A 29 February birthday is
/// reached on 1 March in non-leap years.
pub fn age_in_years(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    if birth > on {
        return None;
    }
    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
