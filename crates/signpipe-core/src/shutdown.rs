//! Cooperative shutdown via a process-wide atomic flag
//!
//! The pipeline stops feeding source items once the flag is set; items
//! already in flight still run to completion and every edge closes normally.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Flag watched by [`Pipeline`](crate::Pipeline) unless it is given another one
pub fn shutdown_flag() -> &'static AtomicBool {
    &SHUTDOWN
}

pub fn is_shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Set the flag. Returns `true` if it was already set (second signal).
///
/// Only touches an atomic, so it may be called from a signal handler.
pub fn request_shutdown() -> bool {
    SHUTDOWN.swap(true, Ordering::Relaxed)
}
