//! CSV reading.

use std::path::Path;

use crate::error::IngestionResult;
use crate::types::{RawRecord, RawValue};

use super::records::{build_record, parse_datetime, unique_headers};

/// Read a CSV file into raw records.
///
/// Rules:
///
/// - The first line is the header row.
/// - Rows may be shorter or longer than the header.
/// - Blank cells are left out of the record; rows without any data are skipped.
/// - Cells are typed by content (see [`parse_csv_cell`]).
pub fn read_csv_records(path: impl AsRef<Path>) -> IngestionResult<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    read_csv_records_from_reader(&mut rdr)
}

/// Read raw records from an existing CSV reader.
pub fn read_csv_records_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> IngestionResult<Vec<RawRecord>> {
    let headers = unique_headers(rdr.headers()?.iter().map(|h| h.trim().to_string()).collect());

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let cells = row.iter().map(parse_csv_cell).collect();
        if let Some(record) = build_record(&headers, cells) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Type one CSV cell by its content.
///
/// Empty → [`RawValue::Empty`]; `true`/`false` in any case → bool; integers and finite decimals →
/// numbers; ISO dates and date-times → [`RawValue::DateTime`]; anything else stays text.
pub fn parse_csv_cell(raw: &str) -> RawValue {
    if raw.is_empty() {
        return RawValue::Empty;
    }
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return RawValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return RawValue::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return RawValue::Int(i);
    }
    if looks_numeric(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            return RawValue::Float(f);
        }
    }
    if let Some(dt) = parse_datetime(trimmed) {
        return RawValue::DateTime(dt);
    }
    RawValue::Text(raw.to_string())
}

// Rejects spellings `f64::from_str` accepts but a spreadsheet would keep as text ("inf", "NaN").
fn looks_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit())
}
