use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Advisory locks keyed by table name.
///
/// Holding the lock for a table covers the existence check through the last insert, so two runs
/// in the same process cannot race on the same table.
#[derive(Default)]
pub struct TableLocks {
    held: Mutex<HashSet<String>>,
    cv: Condvar,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `table` is free, then take it.
    ///
    /// Returns the guard and the time spent waiting.
    pub fn lock(&self, table: &str) -> (TableLockGuard<'_>, Duration) {
        let start = Instant::now();
        let mut waited = false;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(table) {
            waited = true;
            held = self.cv.wait(held).unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(table.to_string());
        let guard = TableLockGuard {
            locks: self,
            table: table.to_string(),
        };
        (guard, if waited { start.elapsed() } else { Duration::ZERO })
    }

    pub fn is_locked(&self, table: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(table)
    }
}

/// Releases its table lock on drop.
pub struct TableLockGuard<'a> {
    locks: &'a TableLocks,
    table: String,
}

impl TableLockGuard<'_> {
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Drop for TableLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.table);
        self.locks.cv.notify_all();
    }
}
