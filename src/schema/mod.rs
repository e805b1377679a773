//! Schema derivation for ingested sheets.
//!
//! Tables are not declared up front; their shape comes from the data:
//!
//! - [`sanitize_column_name()`]: header string → table-safe identifier
//! - [`infer_column_type()`]: sample value → [`crate::types::ColumnType`]
//! - [`plan`]: table naming, create/reject/overwrite decisions, and DDL/DML text
//!
//! ## Example: derive a schema from a sample record
//!
//! ```rust
//! use sheet2sql::schema::{build_schema, table_name_for};
//! use sheet2sql::types::{ColumnType, RawRecord, RawValue};
//!
//! let sample = RawRecord::new(vec![
//!     ("Order Id".to_string(), RawValue::Int(7)),
//!     ("Unit Price ($)".to_string(), RawValue::Float(3.5)),
//! ]);
//! let schema = build_schema(&table_name_for(Some("Q3 Sales")), &sample).unwrap();
//!
//! assert_eq!(schema.table_name, "q3_sales");
//! assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["order_id", "unit_price_"]);
//! assert_eq!(schema.columns[1].column_type, ColumnType::Numeric);
//! ```

pub mod infer;
pub mod plan;
pub mod sanitize;

pub use infer::infer_column_type;
pub use plan::{build_schema, plan, table_name_for, DEFAULT_TABLE_NAME};
pub use sanitize::sanitize_column_name;
