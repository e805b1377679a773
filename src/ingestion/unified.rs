//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which reads the first sheet of a file and
//! materializes it as a table in a [`RelationalStore`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If an [`super::observability::IngestionObserver`] is provided, success/failure/alerts are
//!   reported to it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::store::RelationalStore;
use crate::types::{IngestionReport, RawRecord};

use super::csv;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity};
use super::orchestrator::{notify, run, TableRequest};
use super::quality::DEFAULT_MIN_FILLED_PERCENT;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Options controlling ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Percentage of filled values (relative to the sample row's width) a row needs to be kept.
    pub min_filled_percent: u8,
    /// Run table provisioning and all inserts in one transaction, rolled back on failure.
    pub atomic: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("min_filled_percent", &self.min_filled_percent)
            .field("atomic", &self.atomic)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            min_filled_percent: DEFAULT_MIN_FILLED_PERCENT,
            atomic: false,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Read the first sheet of a file into raw records.
///
/// `format` overrides extension-based detection.
pub fn read_records_from_path(
    path: impl AsRef<Path>,
    format: Option<IngestionFormat>,
) -> IngestionResult<Vec<RawRecord>> {
    let path = path.as_ref();
    let fmt = match format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };
    match fmt {
        IngestionFormat::Csv => csv::read_csv_records(path),
        IngestionFormat::Excel => read_excel_dispatch(path),
    }
}

/// Ingest a file into a table.
///
/// Reads the first sheet, then runs [`super::ingest_records`]. When an observer is configured,
/// this function reports:
///
/// - `on_success` on success, with inserted/rejected counts
/// - `on_failure` on failure (read errors included), with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use sheet2sql::ingestion::{ingest_from_path, IngestionOptions, TableRequest};
/// use sheet2sql::store::DuckDbStore;
///
/// # fn main() -> Result<(), sheet2sql::IngestionError> {
/// let store = DuckDbStore::open("warehouse.duckdb")?;
/// let request = TableRequest::new(Some("Sales"), false);
///
/// // Uses `.xlsx` to select the workbook reader.
/// let report = ingest_from_path(&store, "sales.xlsx", &request, &IngestionOptions::default())?;
/// println!("{} ({} rejected)", report.message, report.rows_rejected);
/// # Ok(())
/// # }
/// ```
///
/// ## Atomic overwrite with an audit log
///
/// ```no_run
/// use std::sync::Arc;
///
/// use sheet2sql::ingestion::{
///     ingest_from_path, FileObserver, IngestionOptions, IngestionSeverity, TableRequest,
/// };
/// use sheet2sql::store::DuckDbStore;
///
/// # fn main() -> Result<(), sheet2sql::IngestionError> {
/// let store = DuckDbStore::open("warehouse.duckdb")?;
/// let opts = IngestionOptions {
///     atomic: true,
///     observer: Some(Arc::new(FileObserver::new("ingest.log"))),
///     alert_at_or_above: IngestionSeverity::Error,
///     ..Default::default()
/// };
///
/// let request = TableRequest::new(Some("sales"), true);
/// ingest_from_path(&store, "sales.csv", &request, &opts)?;
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    store: &dyn RelationalStore,
    path: impl AsRef<Path>,
    request: &TableRequest,
    options: &IngestionOptions,
) -> IngestionResult<IngestionReport> {
    let path = path.as_ref();
    let table = request.effective_table_name();
    let format = match options.format {
        Some(f) => Ok(f),
        None => infer_format_from_path(path),
    };

    let ctx = IngestionContext {
        table_name: table.clone(),
        source: Some(path.to_path_buf()),
        format: format.as_ref().ok().copied(),
    };

    let result = format
        .and_then(|f| read_records_from_path(path, Some(f)))
        .and_then(|records| run(store, &table, request.force_overwrite, &records, options));

    notify(options, &ctx, &result);
    result
}

fn infer_format_from_path(path: &Path) -> IngestionResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            IngestionError::validation(format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ))
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| {
        IngestionError::validation(format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ))
    })
}

fn read_excel_dispatch(path: &Path) -> IngestionResult<Vec<RawRecord>> {
    #[cfg(feature = "excel")]
    {
        super::excel::read_excel_records(path)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = path;
        Err(IngestionError::validation(
            "excel ingestion not enabled (enable cargo feature 'excel')",
        ))
    }
}

/// An owned unit of ingestion work: one file into one table.
///
/// Used by [`crate::execution::IngestionEngine`] to queue batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJob {
    /// Path to the input file.
    pub path: PathBuf,
    /// Target table and overwrite flag.
    pub request: TableRequest,
}

impl IngestionJob {
    pub fn new(path: impl Into<PathBuf>, request: TableRequest) -> Self {
        Self {
            path: path.into(),
            request,
        }
    }

    /// Execute the job by calling [`ingest_from_path`].
    pub fn run(
        &self,
        store: &dyn RelationalStore,
        options: &IngestionOptions,
    ) -> IngestionResult<IngestionReport> {
        ingest_from_path(store, &self.path, &self.request, options)
    }
}
