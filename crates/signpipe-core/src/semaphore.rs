//! Counting semaphore backing the global rate token.
//!
//! A semaphore with a single permit serializes every `Hash1` call that goes
//! through it. Built on `Mutex + Condvar` from std.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A counting semaphore that limits concurrent access to a shared resource.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
}

/// RAII guard that releases one permit on drop.
#[must_use = "the permit is released as soon as the guard is dropped"]
pub struct SemaphoreGuard<'a>(&'a Semaphore);

impl Semaphore {
    /// Create a semaphore with `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    /// Semaphore with exactly one permit: the global rate token.
    pub fn token() -> Self {
        Self::new(1)
    }

    // Counter updates never panic mid-way, so a poisoned count is still valid.
    fn count(&self) -> MutexGuard<'_, usize> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a permit is available, then acquire it.
    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        let mut count = self.count();
        while *count == 0 {
            count = self
                .cond
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
        SemaphoreGuard(self)
    }

    /// Acquire a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<SemaphoreGuard<'_>> {
        let mut count = self.count();
        if *count == 0 {
            return None;
        }
        *count -= 1;
        Some(SemaphoreGuard(self))
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        *self.count()
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count += 1;
        self.0.cond.notify_one();
    }
}
