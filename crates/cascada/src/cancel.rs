//! Cooperative cancellation of running detections.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cloneable flag that requests a running detection to stop.
///
/// Detections check the token between scales, so cancellation takes effect after the scale that is
/// currently being scanned has finished.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Affects all clones of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
