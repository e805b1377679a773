//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - reads the first sheet into [`crate::types::RawRecord`]s
//! - runs them through [`ingest_records`] (from [`orchestrator`])
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Readers are also available directly under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod orchestrator;
pub mod quality;
mod records;
pub mod unified;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use orchestrator::{ingest_records, TableRequest};
pub use quality::{RowQualityFilter, DEFAULT_MIN_FILLED_PERCENT};
pub use unified::{
    ingest_from_path, read_records_from_path, IngestionFormat, IngestionJob, IngestionOptions,
};
