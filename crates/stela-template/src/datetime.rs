/*
 * datetime.rs
 * Copyright (c) 2026 The stela authors
 */

//! Template-facing date/time helpers.
//!
//! Template formats use placeholder tokens (`YYYY-MM-DD HH:MI:SS`)
//! rather than strftime; they are translated before handing off to
//! chrono.

use chrono::{Local, NaiveDate, NaiveDateTime};

pub const DEFAULT_FORMAT: &str = "YYYY-MM-DD HH:MI:SS";

/// Template token to strftime spec, longest token first so `YYYY` wins
/// over `YY`.
const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("MI", "%M"),
    ("SS", "%S"),
];

/// Translate a template format into a strftime format.
pub fn to_strftime(format: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

/// The current local time in the given template format.
pub fn now(format: &str) -> String {
    Local::now().format(&to_strftime(format)).to_string()
}

/// Parse a value in a handful of common layouts.
fn parse(value: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for layout in LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Reformat a date/time value into the given template format, or `None`
/// when the value cannot be parsed.
pub fn format_datetime(value: &str, format: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let dt = parse(value)?;
    Some(dt.format(&to_strftime(format)).to_string())
}

/// Compare two date/time values; `"-1"`, `"0"` or `"1"`.
///
/// Values are canonicalized to `%Y-%m-%d %H:%M:%S` when parseable so
/// `2017-12-10 10:11` and `2017-12-10 10:11:00` compare equal; anything
/// unparseable falls back to string comparison.
pub fn cmp_time(a: &str, b: &str) -> &'static str {
    let canonical = |v: &str| match parse(v.trim()) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => v.trim().to_string(),
    };
    match canonical(a).cmp(&canonical(b)) {
        std::cmp::Ordering::Less => "-1",
        std::cmp::Ordering::Equal => "0",
        std::cmp::Ordering::Greater => "1",
    }
}
