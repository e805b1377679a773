//! Shared row → [`RawRecord`] shaping used by every reader.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{RawRecord, RawValue};

const EMPTY_HEADER: &str = "__EMPTY";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Make header cells usable as record keys.
///
/// Blank headers become `__EMPTY`, repeated headers get `_1`, `_2`, ... suffixes, so every key in
/// a record is distinct.
pub(crate) fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for h in raw {
        let base = if h.is_empty() { EMPTY_HEADER.to_string() } else { h };
        let mut candidate = base.clone();
        let mut n = 0usize;
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        out.push(candidate);
    }
    out
}

/// Pair header keys with the cells of one row.
///
/// Blank cells are left out of the record, as are cells beyond the header width, so a record only
/// carries the keys it has data for. Returns `None` for rows without any data.
pub(crate) fn build_record(headers: &[String], cells: Vec<RawValue>) -> Option<RawRecord> {
    let fields: Vec<(String, RawValue)> = headers
        .iter()
        .zip(cells)
        .filter(|(_, v)| !v.is_empty())
        .map(|(h, v)| (h.clone(), v))
        .collect();
    (!fields.is_empty()).then(|| RawRecord::new(fields))
}

/// Parse ISO-like date or date-time text.
pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
