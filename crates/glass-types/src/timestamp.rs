//! Timestamp resolution through the two-step fallback chain.
//!
//! The chain is attempted in order:
//!
//! 1. Extended ISO-8601 with fractional seconds and an explicit offset or
//!    `Z` designator, e.g. `2024-01-02T03:04:05.678Z`.
//! 2. `yyyy-MM-ddTHH:mm:ssZ` with no fractional part, interpreted as UTC.
//!
//! Decoding and label rendering both call [`resolve_timestamp`], so the
//! two sites can never disagree about which strings are valid.

use std::fmt::Display;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::TimestampError;

const COMPACT_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const LABEL_FORMAT: &str = "%H:%M:%S";

/// Resolves a payload timestamp into an instant.
///
/// # Errors
///
/// Returns [`TimestampError`] when neither accepted format matches.
pub fn resolve_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    parse_fractional_iso8601(raw)
        .or_else(|| parse_compact_utc(raw))
        .ok_or_else(|| TimestampError {
            raw: raw.to_string(),
        })
}

/// Renders the `HH:mm:ss` label for a raw timestamp in the local time zone.
///
/// Returns an empty string when the timestamp does not resolve.
pub fn display_label(raw: &str) -> String {
    display_label_in(raw, &Local)
}

/// Renders the `HH:mm:ss` label for a raw timestamp in `tz`.
pub fn display_label_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match resolve_timestamp(raw) {
        Ok(instant) => instant.with_timezone(tz).format(LABEL_FORMAT).to_string(),
        Err(_) => String::new(),
    }
}

fn parse_fractional_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let bytes = raw.as_bytes();
    if !has_date_time_prefix(bytes) || bytes.get(19) != Some(&b'.') {
        return None;
    }

    let rest = &bytes[20..];
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || !is_offset_suffix(&rest[digits..]) {
        return None;
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_compact_utc(raw: &str) -> Option<DateTime<Utc>> {
    let bytes = raw.as_bytes();
    if bytes.len() != 20 || !has_date_time_prefix(bytes) || bytes[19] != b'Z' {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, COMPACT_UTC_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Checks the fixed-width `yyyy-MM-ddTHH:mm:ss` prefix.
///
/// chrono accepts unpadded fields, signed years and other separators, so
/// the exact shape is verified before handing the string over.
fn has_date_time_prefix(bytes: &[u8]) -> bool {
    const SHAPE: &[u8; 19] = b"dddd-dd-ddTdd:dd:dd";

    bytes.len() >= SHAPE.len()
        && SHAPE.iter().zip(bytes).all(|(&expected, &actual)| match expected {
            b'd' => actual.is_ascii_digit(),
            literal => actual == literal,
        })
}

/// Accepts `Z` or `+hh:mm` / `-hh:mm`.
fn is_offset_suffix(suffix: &[u8]) -> bool {
    match suffix {
        [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] => {
            matches!(sign, b'+' | b'-')
                && [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}
