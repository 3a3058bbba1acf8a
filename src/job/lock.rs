// src/job/lock.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Single-job guard.
///
/// At most one job holds the lock at any time. It is taken by an accepted
/// start and given back by the completion sequence as its very last cleanup
/// step; a start that finds it taken is rejected, never queued.
#[derive(Debug, Default)]
pub struct JobLock {
    active: AtomicBool,
}

impl JobLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare-and-set `false -> true`. Returns whether the caller now owns
    /// the lock.
    pub fn try_acquire(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give the lock back. Returns whether it was held.
    pub fn release(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// The lock, held on behalf of a start that is still in progress.
///
/// Dropping the guard releases the lock, so a start that fails or whose
/// future is dropped mid-way never leaves it held. [`JobLockGuard::hand_over`]
/// passes ownership on to the completion sequence, which releases the lock
/// itself.
#[must_use = "dropping the guard releases the job lock"]
#[derive(Debug)]
pub struct JobLockGuard {
    lock: Option<Arc<JobLock>>,
}

impl JobLockGuard {
    /// Take `lock`, or `None` if a job already holds it.
    pub fn try_acquire(lock: &Arc<JobLock>) -> Option<Self> {
        lock.try_acquire().then(|| Self {
            lock: Some(Arc::clone(lock)),
        })
    }

    /// Keep the lock held past the guard's lifetime.
    pub fn hand_over(mut self) {
        self.lock = None;
    }
}

impl Drop for JobLockGuard {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release();
            debug!("job start abandoned; lock released");
        }
    }
}
