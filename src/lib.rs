//! `sheet2sql` ingests spreadsheet files into relational tables whose schema is inferred from the
//! data itself.
//!
//! The primary entrypoint is [`ingestion::ingest_from_path`], which reads the first sheet of a
//! file, derives a table definition from the first row that carries data, provisions the table
//! (create, reject, or drop-and-recreate), filters sparse rows, and inserts the rest.
//!
//! ## Pipeline
//!
//! 1. **Read**: `.csv` (and, with the default `excel` feature, `.xlsx`/`.xls`/`.xlsm`/`.xlsb`/`.ods`)
//!    become [`types::RawRecord`]s keyed by the header row.
//! 2. **Plan**: the table name is normalized ([`schema::table_name_for`]); if the table exists
//!    and overwrite was not requested, the run stops with [`IngestionError::Conflict`].
//! 3. **Schema**: headers are sanitized ([`schema::sanitize_column_name`]) and each column's type
//!    is inferred from the sample row ([`schema::infer_column_type`]):
//!    - integral number → `INTEGER`
//!    - other number → `NUMERIC`
//!    - date/time → `TIMESTAMP`
//!    - boolean → `BOOLEAN`
//!    - anything else → `TEXT`
//! 4. **Provision**: `DROP` (overwrite only) then `CREATE`.
//! 5. **Load**: rows with fewer than 60% filled values are rejected
//!    ([`ingestion::RowQualityFilter`]); the rest are inserted one at a time, in file order.
//!
//! ## Quick example
//!
//! ```no_run
//! use sheet2sql::ingestion::{ingest_from_path, IngestionOptions, TableRequest};
//! use sheet2sql::store::DuckDbStore;
//!
//! # fn main() -> Result<(), sheet2sql::IngestionError> {
//! let store = DuckDbStore::open("warehouse.duckdb")?;
//! let request = TableRequest::new(Some("sales"), false);
//! let report = ingest_from_path(&store, "sales.xlsx", &request, &IngestionOptions::default())?;
//! println!("rows={} rejected={}", report.rows_inserted, report.rows_rejected);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: readers, the quality filter, and the ingestion orchestrator
//! - [`schema`]: column sanitizing, type inference, and table planning
//! - [`store`]: the relational store capability and its DuckDB implementation
//! - [`execution`]: parallel batch ingestion with per-table locking
//! - [`boundary`]: the upload / table-exists HTTP contract
//! - [`types`]: records, schemas, and reports
//! - [`error`]: error types used across ingestion

pub mod boundary;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
