//! Cooperative stop signal shared by the long-running loops.
//!
//! Loops never block on the token; they poll it at a bounded interval
//! (see [`ServerConfig::poll_interval`](crate::ServerConfig::poll_interval)).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable stop flag. Cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
