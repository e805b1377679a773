use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::IngestionError;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// The caller can fix the request (bad input, table name conflict).
    Warning,
    /// Error-level event (run failed).
    Error,
    /// Critical error (I/O or store infrastructure failures).
    Critical,
}

impl IngestionSeverity {
    /// Classify an ingestion failure.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Io(_) | IngestionError::Store(_) => IngestionSeverity::Critical,
            IngestionError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
                _ => IngestionSeverity::Error,
            },
            #[cfg(feature = "excel")]
            IngestionError::Excel(_) => IngestionSeverity::Error,
            IngestionError::Validation { .. } | IngestionError::Conflict { .. } => {
                IngestionSeverity::Warning
            }
            IngestionError::EmptyInput
            | IngestionError::InvalidColumn { .. }
            | IngestionError::Provisioning { .. }
            | IngestionError::Insertion { .. } => IngestionSeverity::Error,
        }
    }
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Effective target table.
    pub table_name: String,
    /// Input path, when the run started from a file.
    pub source: Option<PathBuf>,
    /// Format used to read the input, when known.
    pub format: Option<IngestionFormat>,
}

impl IngestionContext {
    fn source_label(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Rows written to the table.
    pub rows_inserted: usize,
    /// Rows dropped by the quality filter.
    pub rows_rejected: usize,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when ingestion succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            table = %ctx.table_name,
            source = %ctx.source_label(),
            format = ?ctx.format,
            rows = stats.rows_inserted,
            rejected = stats.rows_rejected,
            "ingestion succeeded"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        if severity <= IngestionSeverity::Warning {
            tracing::warn!(table = %ctx.table_name, source = %ctx.source_label(), ?severity, %error, "ingestion rejected");
        } else {
            tracing::error!(table = %ctx.table_name, source = %ctx.source_label(), ?severity, %error, "ingestion failed");
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            alert = true,
            table = %ctx.table_name,
            source = %ctx.source_label(),
            ?severity,
            %error,
            "ingestion alert"
        );
    }
}

/// Appends ingestion events to a local audit log.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", Utc::now().to_rfc3339());
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "ok table={} source={} rows={} rejected={}",
            ctx.table_name,
            ctx.source_label(),
            stats.rows_inserted,
            stats.rows_rejected
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "fail severity={:?} table={} source={} err={}",
            severity,
            ctx.table_name,
            ctx.source_label(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "ALERT severity={:?} table={} source={} err={}",
            severity,
            ctx.table_name,
            ctx.source_label(),
            error
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ranks_caller_errors_below_failures() {
        assert_eq!(
            IngestionSeverity::for_error(&IngestionError::Conflict {
                table: "t".to_string()
            }),
            IngestionSeverity::Warning
        );
        assert_eq!(
            IngestionSeverity::for_error(&IngestionError::EmptyInput),
            IngestionSeverity::Error
        );
        assert_eq!(
            IngestionSeverity::for_error(&IngestionError::Io(std::io::Error::other("disk"))),
            IngestionSeverity::Critical
        );
        assert!(IngestionSeverity::Warning < IngestionSeverity::Critical);
    }

    #[test]
    fn file_observer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let obs = FileObserver::new(&path);
        let ctx = IngestionContext {
            table_name: "sales".to_string(),
            source: None,
            format: None,
        };
        obs.on_success(
            &ctx,
            IngestionStats {
                rows_inserted: 9,
                rows_rejected: 1,
            },
        );
        obs.on_failure(&ctx, IngestionSeverity::Error, &IngestionError::EmptyInput);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("ok table=sales source=- rows=9 rejected=1"));
        assert!(lines[1].contains("fail severity=Error table=sales"));
    }
}
