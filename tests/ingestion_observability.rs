use std::sync::{Arc, Mutex};

use sheet2sql::ingestion::{
    ingest_from_path, ingest_records, CompositeObserver, FileObserver, IngestionContext, IngestionObserver,
    IngestionOptions, IngestionSeverity, IngestionStats, TableRequest,
};
use sheet2sql::store::DuckDbStore;
use sheet2sql::types::{RawRecord, RawValue};
use sheet2sql::IngestionError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(String, IngestionStats)>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push((ctx.table_name.clone(), stats));
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options_with(obs: Arc<RecordingObserver>) -> IngestionOptions {
    IngestionOptions {
        observer: Some(obs),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_success_stats() {
    let store = DuckDbStore::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    ingest_from_path(
        &store,
        "tests/fixtures/sales_10.csv",
        &TableRequest::new(Some("sales"), false),
        &options_with(obs.clone()),
    )
    .unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(
        successes,
        vec![(
            "sales".to_string(),
            IngestionStats {
                rows_inserted: 9,
                rows_rejected: 1
            }
        )]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_missing_file() {
    let store = DuckDbStore::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    ingest_from_path(
        &store,
        "tests/fixtures/does_not_exist.csv",
        &TableRequest::new(Some("missing"), false),
        &options_with(obs.clone()),
    )
    .unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
}

#[test]
fn conflict_is_a_warning_without_alert() {
    let store = DuckDbStore::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let options = options_with(obs.clone());
    let request = TableRequest::new(Some("sales"), false);
    ingest_from_path(&store, "tests/fixtures/sales_10.csv", &request, &options).unwrap();
    ingest_from_path(&store, "tests/fixtures/sales_10.csv", &request, &options).unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Warning]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn record_ingestion_reports_to_composite_and_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.log");
    let recorder = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn IngestionObserver>> = vec![recorder.clone(), Arc::new(FileObserver::new(&log))];
    let composite = CompositeObserver::new(observers);
    let options = IngestionOptions {
        observer: Some(Arc::new(composite)),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };

    let store = DuckDbStore::open_in_memory().unwrap();
    let blank = vec![RawRecord::new(vec![("a".to_string(), RawValue::Empty)])];
    ingest_records(&store, &TableRequest::new(Some("t"), false), &blank, &options).unwrap_err();

    assert_eq!(recorder.failures.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
    assert_eq!(recorder.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Error]);

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("fail severity=Error table=t source=-"));
    assert!(lines[1].contains("ALERT severity=Error table=t"));
}
