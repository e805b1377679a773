//! Core data model types for ingestion.
//!
//! Readers turn each spreadsheet row into a [`RawRecord`] of loosely typed [`RawValue`]s. The
//! schema planner derives a [`TableSchema`] from one sample record, and a finished run is
//! summarized by an [`IngestionReport`].

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// A single cell value as read from the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Missing/empty cell.
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Date and/or time, without timezone.
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// `true` for [`RawValue::Empty`] and the empty string.
    ///
    /// Whitespace-only text counts as data.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Empty => Ok(()),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One parsed row: original header names mapped to raw values, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    /// Create a record from `(header, value)` pairs.
    pub fn new(fields: Vec<(String, RawValue)>) -> Self {
        Self { fields }
    }

    /// Look up a value by its original header.
    pub fn get(&self, header: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// Iterate headers in original order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    /// Iterate `(header, value)` pairs in original order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v))
    }

    /// Number of keys in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of values that are neither empty nor the empty string.
    pub fn non_empty_count(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_empty()).count()
    }

    /// `true` if at least one value carries data.
    pub fn has_data(&self) -> bool {
        self.fields.iter().any(|(_, v)| !v.is_empty())
    }
}

/// Storage type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Numeric,
    Boolean,
    Timestamp,
    Text,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A planned table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Header as it appeared in the source file.
    pub source: String,
    /// Sanitized identifier used in the table.
    pub name: String,
    /// Storage type inferred from the sample row.
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(source: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            column_type,
        }
    }
}

/// Table definition derived from one sample record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Effective table name.
    pub table_name: String,
    /// Ordered columns.
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Iterate sanitized column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the index of a column by sanitized name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// What provisioning does with the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    /// The table is absent and will be created.
    CreateNew,
    /// The table exists and overwrite was not requested; nothing is touched.
    RejectExisting,
    /// The table exists and will be dropped and recreated.
    Overwrite,
}

/// Summary of one finished ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub table_name: String,
    pub columns: Vec<Column>,
    pub rows_inserted: usize,
    pub rows_rejected: usize,
    pub outcome: PlanOutcome,
    pub message: String,
}

impl IngestionReport {
    /// Sanitized column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
