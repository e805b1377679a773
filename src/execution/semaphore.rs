use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Counting semaphore bounding how many runs hold a store session at once.
pub struct Semaphore {
    available: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "permits must be > 0");
        Self {
            available: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Block until a permit is free.
    ///
    /// Returns the permit and the time spent waiting for it.
    pub fn acquire(&self) -> (Permit<'_>, Duration) {
        let start = Instant::now();
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        let mut waited = Duration::ZERO;
        while *available == 0 {
            available = self.cv.wait(available).unwrap_or_else(PoisonError::into_inner);
            waited = start.elapsed();
        }
        *available -= 1;
        (Permit { sem: self }, waited)
    }
}

/// Returns its permit on drop, including when the run panics.
pub struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.sem.available.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.sem.cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::Semaphore;

    #[test]
    fn second_acquire_waits_for_drop() {
        let sem = Arc::new(Semaphore::new(1));
        let (permit, waited) = sem.acquire();
        assert_eq!(waited, Duration::ZERO);

        let contender = {
            let sem = Arc::clone(&sem);
            std::thread::spawn(move || {
                let (_permit, waited) = sem.acquire();
                waited
            })
        };
        std::thread::sleep(Duration::from_millis(30));
        drop(permit);

        assert!(contender.join().unwrap() > Duration::ZERO);
    }
}
