//! Lenient calendar date parsing.
//!
//! Spreadsheet exports carry dates in many shapes. Anything that cannot be
//! read as a calendar day becomes `None`; a time-of-day suffix is dropped.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Canonical display/export format.
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Which field comes first in ambiguous numeric dates such as `03/04/2021`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// `MM/DD/YYYY` preferred, day-first accepted when the month is out of range
    MonthFirst,
    /// `DD/MM/YYYY` preferred
    DayFirst,
}

const ISO_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const DAY_FIRST_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%y", "%d/%m/%y"];

const MONTH_FIRST_FORMATS: &[&str] = &["%m-%d-%Y", "%m/%d/%Y", "%m.%d.%Y", "%m-%d-%y", "%m/%d/%y"];

const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO `YYYY-MM-DD` date, ignoring any time-of-day suffix.
pub fn parse_iso(raw: &str) -> Option<NaiveDate> {
    let raw = strip_time(raw.trim());
    NaiveDate::parse_from_str(raw, ISO_FORMAT).ok()
}

/// Parse a date cell, returning `None` for anything unreadable.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    let date_part = strip_time(raw);

    let numeric_order: [&[&str]; 2] = match order {
        DateOrder::DayFirst => [DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS],
        DateOrder::MonthFirst => [MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS],
    };

    ISO_FORMATS
        .iter()
        .chain(numeric_order[0])
        .chain(numeric_order[1])
        .chain(NAMED_MONTH_FORMATS)
        .find_map(|fmt| {
            // `%Y` accepts two-digit years, so "15-03-21" would otherwise land in year 21
            NaiveDate::parse_from_str(date_part, fmt)
                .ok()
                .filter(|d| d.year() >= 1000)
        })
}

/// Drop a trailing time-of-day (`... 10:30:00`, `... 10:30 AM` or `...T10:30:00`).
fn strip_time(raw: &str) -> &str {
    let raw = strip_meridiem(raw);
    if let Some((head, tail)) = raw.rsplit_once(' ') {
        if tail.contains(':') {
            return head.trim_end();
        }
    }
    if let Some((head, tail)) = raw.split_once('T') {
        if tail.contains(':') && head.len() >= 8 {
            return head;
        }
    }
    raw
}

/// Drop a 12-hour clock marker that follows a time, keeping the time itself.
fn strip_meridiem(raw: &str) -> &str {
    match raw.rsplit_once(' ') {
        Some((head, marker))
            if head.contains(':')
                && (marker.eq_ignore_ascii_case("AM") || marker.eq_ignore_ascii_case("PM")) =>
        {
            head.trim_end()
        }
        _ => raw,
    }
}
