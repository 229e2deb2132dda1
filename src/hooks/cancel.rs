//! Cooperative cancellation for hook chains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared flag polled by the dispatcher between hooks and available to
/// handlers that want to abort long work promptly.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
