//! Repairs of the text that was mangled before it reached us. Scraped
//! messages occasionally contain broken emoji and binary garbage, and the
//! warehouse must accept them anyway.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::borrow::Cow;

const REPLACEMENT_ESCAPE: &str = "\\ufffd";

/// Replaces the `\uXXXX` escapes of UTF-16 surrogates that don't form a valid
/// pair with the escape of `U+FFFD`. JSON parsers reject such strings, although
/// they are routinely produced by truncating text in the middle of an emoji.
pub(crate) fn repair_surrogate_escapes(json: &str) -> Cow<'_, str> {
    let bytes = json.as_bytes();

    let mut repaired = String::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }

        let Some(unit) = unicode_escape_at(bytes, i) else {
            // Any other escape, including the escaped backslash itself
            i += 2;
            continue;
        };

        if !is_surrogate(unit) {
            i += 6;
            continue;
        }

        let is_pair = is_high_surrogate(unit)
            && unicode_escape_at(bytes, i + 6).is_some_and(is_low_surrogate);

        if is_pair {
            i += 12;
            continue;
        }

        repaired.push_str(&json[copied..i]);
        repaired.push_str(REPLACEMENT_ESCAPE);
        i += 6;
        copied = i;
    }

    if copied == 0 {
        return Cow::Borrowed(json);
    }

    repaired.push_str(&json[copied..]);
    Cow::Owned(repaired)
}

fn unicode_escape_at(bytes: &[u8], at: usize) -> Option<u16> {
    let escape = bytes.get(at..at + 6)?;
    let digits = escape.strip_prefix(b"\\u")?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u16::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

fn is_surrogate(unit: u16) -> bool {
    (0xD800..=0xDFFF).contains(&unit)
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Postgres `text` can't store NUL characters
pub(crate) fn replace_nul(text: String) -> String {
    if text.contains('\0') {
        text.replace('\0', "\u{FFFD}")
    } else {
        text
    }
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses the timestamp in one of the formats the scrapers are known to
/// produce. Timestamps without an offset are considered to be in UTC.
pub(crate) fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let with_offset = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(input, format).ok())
        .map(|timestamp| timestamp.with_timezone(&Utc));

    if with_offset.is_some() {
        return with_offset;
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })?;

    Some(Utc.from_utc_datetime(&naive))
}
