//! Table planning: naming, create/reject/overwrite decisions, and statement text.

use std::collections::HashMap;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Column, ColumnType, PlanOutcome, RawRecord, TableSchema};

use super::{infer_column_type, sanitize_column_name};

/// Table used when the caller does not name one.
pub const DEFAULT_TABLE_NAME: &str = "excel_data";

/// Derive the effective table name from an optional caller-supplied name.
///
/// The name is lowercased and each whitespace run becomes `_`. It is not otherwise sanitized;
/// statements quote it instead.
pub fn table_name_for(requested: Option<&str>) -> String {
    let Some(name) = requested.filter(|n| !n.is_empty()) else {
        return DEFAULT_TABLE_NAME.to_string();
    };
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Decide what provisioning does given catalog state and the overwrite flag.
pub fn plan(table_exists: bool, force_overwrite: bool) -> PlanOutcome {
    match (table_exists, force_overwrite) {
        (false, _) => PlanOutcome::CreateNew,
        (true, false) => PlanOutcome::RejectExisting,
        (true, true) => PlanOutcome::Overwrite,
    }
}

/// Build the table schema from the sample record, preserving its key order.
///
/// Fails when a header sanitizes to an empty identifier or when two headers sanitize to the same
/// identifier.
pub fn build_schema(table_name: &str, sample: &RawRecord) -> IngestionResult<TableSchema> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(sample.len());
    let mut columns = Vec::with_capacity(sample.len());

    for (header, value) in sample.iter() {
        let name = sanitize_column_name(header);
        if name.is_empty() {
            return Err(IngestionError::InvalidColumn {
                header: header.to_string(),
                message: "header has no letters, digits or underscores".to_string(),
            });
        }
        if let Some(previous) = seen.insert(name.clone(), header) {
            return Err(IngestionError::InvalidColumn {
                header: header.to_string(),
                message: format!("sanitizes to '{name}', same as header '{previous}'"),
            });
        }
        columns.push(Column::new(header, name, infer_column_type(value)));
    }

    Ok(TableSchema::new(table_name, columns))
}

/// Quote an identifier for use in SQL text.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `CREATE TABLE` statement; `type_name` maps each column type to the store's type name.
pub fn create_table_sql(schema: &TableSchema, type_name: impl Fn(ColumnType) -> &'static str) -> String {
    let defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), type_name(c.column_type)))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&schema.table_name),
        defs.join(", ")
    )
}

pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table_name))
}

/// Parameterized single-row insert in schema column order (`?` placeholders).
pub fn insert_sql(schema: &TableSchema) -> String {
    let names: Vec<String> = schema.column_names().map(quote_ident).collect();
    let placeholders = vec!["?"; names.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&schema.table_name),
        names.join(", "),
        placeholders
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawValue;

    fn sample() -> RawRecord {
        RawRecord::new(vec![
            ("Id".to_string(), RawValue::Int(1)),
            ("Unit Price".to_string(), RawValue::Float(9.99)),
            ("Active?".to_string(), RawValue::Bool(true)),
            ("Notes".to_string(), RawValue::Empty),
        ])
    }

    #[test]
    fn table_name_defaults_and_normalizes() {
        assert_eq!(table_name_for(None), DEFAULT_TABLE_NAME);
        assert_eq!(table_name_for(Some("")), DEFAULT_TABLE_NAME);
        assert_eq!(table_name_for(Some("Sales")), "sales");
        assert_eq!(table_name_for(Some("Q3  Sales Report")), "q3_sales_report");
    }

    #[test]
    fn plan_covers_all_states() {
        assert_eq!(plan(false, false), PlanOutcome::CreateNew);
        assert_eq!(plan(false, true), PlanOutcome::CreateNew);
        assert_eq!(plan(true, false), PlanOutcome::RejectExisting);
        assert_eq!(plan(true, true), PlanOutcome::Overwrite);
    }

    #[test]
    fn build_schema_keeps_order_and_types() {
        let schema = build_schema("sales", &sample()).unwrap();
        assert_eq!(
            schema.column_names().collect::<Vec<_>>(),
            vec!["id", "unit_price", "active", "notes"]
        );
        let types: Vec<ColumnType> = schema.columns.iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Numeric,
                ColumnType::Boolean,
                ColumnType::Text
            ]
        );
        assert_eq!(schema.columns[1].source, "Unit Price");
    }

    #[test]
    fn build_schema_rejects_duplicate_sanitized_names() {
        let sample = RawRecord::new(vec![
            ("Total".to_string(), RawValue::Int(1)),
            ("total ".to_string(), RawValue::Int(2)),
        ]);
        let err = build_schema("t", &sample).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid column 'total '"), "{msg}");
        assert!(msg.contains("same as header 'Total'"), "{msg}");
    }

    #[test]
    fn build_schema_rejects_symbolic_header() {
        let sample = RawRecord::new(vec![("%%".to_string(), RawValue::Int(1))]);
        assert!(matches!(
            build_schema("t", &sample),
            Err(IngestionError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn statements_quote_identifiers() {
        let schema = build_schema("q3 \"x\"", &sample()).unwrap();
        assert_eq!(
            create_table_sql(&schema, ColumnType::sql_name),
            "CREATE TABLE \"q3 \"\"x\"\"\" (\"id\" INTEGER, \"unit_price\" NUMERIC, \"active\" BOOLEAN, \"notes\" TEXT)"
        );
        assert!(
            create_table_sql(&schema, |t| if t == ColumnType::Numeric { "DOUBLE" } else { t.sql_name() })
                .contains("\"unit_price\" DOUBLE")
        );
        assert_eq!(drop_table_sql("sales"), "DROP TABLE IF EXISTS \"sales\"");
        assert_eq!(
            insert_sql(&build_schema("sales", &sample()).unwrap()),
            "INSERT INTO \"sales\" (\"id\", \"unit_price\", \"active\", \"notes\") VALUES (?, ?, ?, ?)"
        );
    }
}
