//! Single-pipeline-at-a-time guard.
//!
//! Acquisition is one atomic test-and-set. The returned [`InFlightGuard`]
//! releases on drop, so every exit path of the pipeline (including a panic
//! unwinding through the task) clears the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct InFlightLock {
    held: AtomicBool,
}

impl InFlightLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Takes the lock if it is free. `None` means a pipeline is running.
    pub fn try_acquire(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { lock: Arc::clone(self) })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of admission. Dropping it releases the lock.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    lock: Arc<InFlightLock>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
