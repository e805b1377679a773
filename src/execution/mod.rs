//! Batch execution of ingestion jobs with configurable parallelism.
//!
//! This module sits "above" [`crate::ingestion`] and provides:
//!
//! - Parallel execution of many [`IngestionJob`]s, each on its own store session
//! - Resource limits (in-flight runs) and per-table advisory locking
//! - Real-time metrics + observer hooks for monitoring
//!
//! A single run is always sequential; parallelism only exists between runs.

mod locks;
mod observer;
mod semaphore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::IngestionResult;
use crate::ingestion::{IngestionJob, IngestionOptions};
use crate::store::RelationalStore;
use crate::types::IngestionReport;

pub use locks::{TableLockGuard, TableLocks};
pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`IngestionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently executing runs (and so on open store sessions).
    ///
    /// This is an additional throttle on top of `num_threads`.
    pub max_in_flight_runs: usize,
    /// Serialize jobs that target the same table.
    pub lock_tables: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight_runs: n.max(1),
            lock_tables: true,
        }
    }
}

/// Runs batches of ingestion jobs against a shared store.
pub struct IngestionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
    locks: TableLocks,
}

impl IngestionEngine {
    /// Create a new engine with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight_runs == 0` or `num_threads == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> Result<Self, ThreadPoolBuildError> {
        assert!(opts.max_in_flight_runs > 0, "max_in_flight_runs must be > 0");
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("sheet2sql-ingest-{i}"))
            .build()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
            locks: TableLocks::new(),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every job and return their results in job order.
    ///
    /// A failing job does not stop the others.
    pub fn run_batch(
        &self,
        store: &dyn RelationalStore,
        jobs: &[IngestionJob],
        options: &IngestionOptions,
    ) -> Vec<IngestionResult<IngestionReport>> {
        self.pool.install(|| self.run_batch_impl(store, jobs, options))
    }

    fn run_batch_impl(
        &self,
        store: &dyn RelationalStore,
        jobs: &[IngestionJob],
        options: &IngestionOptions,
    ) -> Vec<IngestionResult<IngestionReport>> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted { jobs: jobs.len() });

        let sem = Semaphore::new(self.opts.max_in_flight_runs);

        let results: Vec<IngestionResult<IngestionReport>> = jobs
            .par_iter()
            .enumerate()
            .map(|(index, job)| {
                let (permit, waited) = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                let table = job.request.effective_table_name();
                let guard = if self.opts.lock_tables {
                    let (guard, waited) = self.locks.lock(&table);
                    if waited > Duration::ZERO {
                        self.metrics.on_lock_wait(waited);
                        self.emit(ExecutionEvent::LockWaited {
                            table: table.clone(),
                            duration: waited,
                        });
                    }
                    Some(guard)
                } else {
                    None
                };

                self.metrics.on_job_start();
                self.emit(ExecutionEvent::JobStarted {
                    index,
                    table: table.clone(),
                });

                let result = job.run(store, options);

                self.metrics.on_job_end(&result);
                self.emit(ExecutionEvent::JobFinished {
                    index,
                    table,
                    succeeded: result.is_ok(),
                });
                drop(guard);
                drop(permit);
                result
            })
            .collect();

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        results
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutionOptions, IngestionEngine};
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::error::IngestionError;
    use crate::execution::{ExecutionEvent, ExecutionObserver};
    use crate::ingestion::{IngestionJob, IngestionOptions, TableRequest};
    use crate::store::{RelationalStore, StoreError, StoreSession};
    use crate::types::RawValue;

    /// Catalog-only fake store that records how many sessions touch each table at once.
    #[derive(Default)]
    struct CountingStore {
        tables: Mutex<HashSet<String>>,
        active: Mutex<HashMap<String, usize>>,
        max_per_table: Mutex<HashMap<String, usize>>,
        active_total: AtomicUsize,
        max_total: AtomicUsize,
    }

    impl CountingStore {
        fn max_for(&self, table: &str) -> usize {
            *self.max_per_table.lock().unwrap().get(table).unwrap_or(&0)
        }
    }

    struct CountingSession<'a> {
        store: &'a CountingStore,
        table: Option<String>,
    }

    impl RelationalStore for CountingStore {
        fn connect(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
            let now = self.active_total.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_total.fetch_max(now, Ordering::SeqCst);
            Ok(Box::new(CountingSession {
                store: self,
                table: None,
            }))
        }
    }

    impl StoreSession for CountingSession<'_> {
        fn table_exists(&mut self, name: &str) -> Result<bool, StoreError> {
            let mut active = self.store.active.lock().unwrap();
            let n = active.entry(name.to_string()).or_insert(0);
            *n += 1;
            let mut max = self.store.max_per_table.lock().unwrap();
            let m = max.entry(name.to_string()).or_insert(0);
            *m = (*m).max(*n);
            self.table = Some(name.to_string());
            Ok(self.store.tables.lock().unwrap().contains(name))
        }

        fn execute(&mut self, sql: &str, _params: &[RawValue]) -> Result<usize, StoreError> {
            let table = self.table.clone().unwrap_or_default();
            if sql.starts_with("CREATE TABLE") {
                if !self.store.tables.lock().unwrap().insert(table.clone()) {
                    return Err(StoreError::new(format!("table {table} already exists")));
                }
            } else if sql.starts_with("DROP TABLE") {
                self.store.tables.lock().unwrap().remove(&table);
            } else if sql.starts_with("INSERT") {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(1)
        }
    }

    impl Drop for CountingSession<'_> {
        fn drop(&mut self) {
            self.store.active_total.fetch_sub(1, Ordering::SeqCst);
            if let Some(t) = &self.table {
                if let Some(n) = self.store.active.lock().unwrap().get_mut(t) {
                    *n -= 1;
                }
            }
        }
    }

    fn write_csv(dir: &std::path::Path, name: &str, rows: usize) -> PathBuf {
        let mut body = String::from("id,name,score\n");
        for i in 0..rows {
            body.push_str(&format!("{i},user{i},{}.5\n", i * 10));
        }
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn engine(threads: usize, in_flight: usize, lock_tables: bool) -> IngestionEngine {
        IngestionEngine::new(ExecutionOptions {
            num_threads: Some(threads),
            max_in_flight_runs: in_flight,
            lock_tables,
        })
        .unwrap()
    }

    #[test]
    fn same_table_jobs_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", 5);
        let jobs: Vec<IngestionJob> = (0..6)
            .map(|_| IngestionJob::new(&path, TableRequest::new(Some("shared"), true)))
            .collect();

        let store = CountingStore::default();
        let results = engine(4, 4, true).run_batch(&store, &jobs, &IngestionOptions::default());

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(store.max_for("shared"), 1);
    }

    #[test]
    fn locked_conflicts_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", 3);
        let jobs: Vec<IngestionJob> = (0..3)
            .map(|_| IngestionJob::new(&path, TableRequest::new(Some("once"), false)))
            .collect();

        let store = CountingStore::default();
        let results = engine(3, 3, true).run_batch(&store, &jobs, &IngestionOptions::default());

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(IngestionError::Conflict { .. })))
            .count();
        assert_eq!((ok, conflicts), (1, 2));
    }

    #[test]
    fn distinct_tables_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<IngestionJob> = (0..8)
            .map(|i| {
                let path = write_csv(dir.path(), &format!("t{i}.csv"), 20);
                IngestionJob::new(path, TableRequest::new(Some(format!("t{i}").as_str()), false))
            })
            .collect();

        let store = CountingStore::default();
        let results = engine(4, 4, true).run_batch(&store, &jobs, &IngestionOptions::default());

        assert!(results.iter().all(|r| r.is_ok()));
        assert!(store.max_total.load(Ordering::SeqCst) > 1);
    }

    #[derive(Default)]
    struct ActiveJobsObserver {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ExecutionObserver for ActiveJobsObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::JobStarted { .. } => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_active.fetch_max(now, Ordering::SeqCst);
                }
                ExecutionEvent::JobFinished { .. } => {
                    let _ = self.active.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn max_in_flight_runs_throttles_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<IngestionJob> = (0..6)
            .map(|i| {
                let path = write_csv(dir.path(), &format!("t{i}.csv"), 10);
                IngestionJob::new(path, TableRequest::new(Some(format!("t{i}").as_str()), false))
            })
            .collect();

        let observer = Arc::new(ActiveJobsObserver::default());
        let obs_trait: Arc<dyn ExecutionObserver> = observer.clone();
        let store = CountingStore::default();
        let results = engine(4, 1, false)
            .with_observer(obs_trait)
            .run_batch(&store, &jobs, &IngestionOptions::default());

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(observer.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(store.max_total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_are_available_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_csv(dir.path(), "good.csv", 4);
        let missing = dir.path().join("missing.csv");
        let jobs = vec![
            IngestionJob::new(&good, TableRequest::new(Some("a"), false)),
            IngestionJob::new(&missing, TableRequest::new(Some("b"), false)),
            IngestionJob::new(&good, TableRequest::new(Some("c"), false)),
        ];

        let e = engine(2, 1, true);
        let metrics = e.metrics();
        let store = CountingStore::default();
        let results = e.run_batch(&store, &jobs, &IngestionOptions::default());

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(IngestionError::Csv(_)) | Err(IngestionError::Io(_))));
        assert!(results[2].is_ok());

        let snap = metrics.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.jobs_started, 3);
        assert_eq!(snap.jobs_succeeded, 2);
        assert_eq!(snap.jobs_failed, 1);
        assert_eq!(snap.rows_inserted, 8);
        assert_eq!(snap.rows_rejected, 0);
        assert_eq!(snap.max_active_jobs, 1);
        assert!(snap.elapsed.is_some());
    }
}
