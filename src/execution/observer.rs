use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::IngestionResult;
use crate::types::IngestionReport;

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { jobs: usize },
    ThrottleWaited { duration: Duration },
    LockWaited { table: String, duration: Duration },
    JobStarted { index: usize, table: String },
    JobFinished { index: usize, table: String, succeeded: bool },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Forwards execution events to `tracing` at debug level.
#[derive(Default)]
pub struct TracingExecutionObserver;

impl ExecutionObserver for TracingExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunFinished { metrics, .. } => tracing::info!(%metrics, "batch finished"),
            other => tracing::debug!(event = ?other, "batch event"),
        }
    }
}

/// Real-time metrics for a batch run.
///
/// The engine updates these counters during execution; callers can snapshot them at any time.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    jobs_started: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    rows_inserted: AtomicU64,
    rows_rejected: AtomicU64,
    throttle_wait_ns: AtomicU64,
    lock_wait_ns: AtomicU64,

    active_jobs: AtomicUsize,
    max_active_jobs: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            jobs_started: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            rows_inserted: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            lock_wait_ns: AtomicU64::new(0),
            active_jobs: AtomicUsize::new(0),
            max_active_jobs: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        *self.started_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.jobs_started.store(0, Ordering::SeqCst);
        self.jobs_succeeded.store(0, Ordering::SeqCst);
        self.jobs_failed.store(0, Ordering::SeqCst);
        self.rows_inserted.store(0, Ordering::SeqCst);
        self.rows_rejected.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.lock_wait_ns.store(0, Ordering::SeqCst);
        self.active_jobs.store(0, Ordering::SeqCst);
        self.max_active_jobs.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(duration_ns(elapsed), Ordering::SeqCst);
    }

    pub fn on_job_start(&self) {
        let _ = self.jobs_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_jobs.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_jobs, now);
    }

    pub fn on_job_end(&self, result: &IngestionResult<IngestionReport>) {
        match result {
            Ok(report) => {
                let _ = self.jobs_succeeded.fetch_add(1, Ordering::SeqCst);
                let _ = self
                    .rows_inserted
                    .fetch_add(report.rows_inserted as u64, Ordering::SeqCst);
                let _ = self
                    .rows_rejected
                    .fetch_add(report.rows_rejected as u64, Ordering::SeqCst);
            }
            Err(_) => {
                let _ = self.jobs_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        let _ = self.active_jobs.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        let _ = self.throttle_wait_ns.fetch_add(duration_ns(d), Ordering::SeqCst);
    }

    pub fn on_lock_wait(&self, d: Duration) {
        let _ = self.lock_wait_ns.fetch_add(duration_ns(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            jobs_started: self.jobs_started.load(Ordering::SeqCst),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::SeqCst),
            jobs_failed: self.jobs_failed.load(Ordering::SeqCst),
            rows_inserted: self.rows_inserted.load(Ordering::SeqCst),
            rows_rejected: self.rows_rejected.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            lock_wait: Duration::from_nanos(self.lock_wait_ns.load(Ordering::SeqCst)),
            max_active_jobs: self.max_active_jobs.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ns(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub jobs_started: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub rows_inserted: u64,
    pub rows_rejected: u64,
    pub throttle_wait: Duration,
    pub lock_wait: Duration,
    pub max_active_jobs: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, jobs={}/{} ok, failed={}, rows_inserted={}, rows_rejected={}, max_active_jobs={}, throttle_wait={:?}, lock_wait={:?}, elapsed={:?}",
            self.run_id,
            self.jobs_succeeded,
            self.jobs_started,
            self.jobs_failed,
            self.rows_inserted,
            self.rows_rejected,
            self.max_active_jobs,
            self.throttle_wait,
            self.lock_wait,
            self.elapsed
        )
    }
}
