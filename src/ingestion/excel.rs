#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawRecord, RawValue};

use super::records::{build_record, parse_datetime, unique_headers};

/// Read the first sheet of a workbook (`.xlsx`, `.xls`, `.ods`, etc.) into raw records.
///
/// Behavior:
/// - Only sheet index 0 is read; other sheets are ignored
/// - Detects the first non-empty row as the header row
/// - Blank cells are left out of each record; rows without any data are skipped
/// - Date cells become [`RawValue::DateTime`]
pub fn read_excel_records(path: impl AsRef<Path>) -> IngestionResult<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestionError::validation("workbook has no sheets"))??;
    Ok(records_from_range(&range))
}

fn records_from_range(range: &Range<Data>) -> Vec<RawRecord> {
    let mut rows = range.rows();

    let header_cells = loop {
        match rows.next() {
            Some(row) if row.iter().any(|c| !matches!(c, Data::Empty)) => {
                break row.iter().map(cell_to_header_string).collect::<Vec<_>>();
            }
            Some(_) => continue,
            None => return Vec::new(),
        }
    };
    let headers = unique_headers(header_cells);

    rows.filter_map(|row| build_record(&headers, row.iter().map(cell_value).collect()))
        .collect()
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // `Display` prints integral floats without a fraction ("2024", not "2024.0").
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn cell_value(c: &Data) -> RawValue {
    match c {
        Data::Empty => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => RawValue::Text(dt.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(RawValue::DateTime)
            .unwrap_or_else(|| RawValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime(s)
            .map(RawValue::DateTime)
            .unwrap_or_else(|| RawValue::Text(s.clone())),
        Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(e) => RawValue::Text(e.to_string()),
    }
}
