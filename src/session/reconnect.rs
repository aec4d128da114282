//! Reconnect scheduling guard

use std::sync::atomic::{AtomicBool, Ordering};

/// Ensures at most one reconnect is pending at a time.
///
/// Set when a disconnect schedules a reconnect; cleared only when the next
/// connection attempt begins.
#[derive(Debug, Default)]
pub struct ReconnectGuard {
    scheduled: AtomicBool,
}

impl ReconnectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the pending reconnect slot. Returns `false` if a reconnect is
    /// already scheduled.
    pub fn try_schedule(&self) -> bool {
        !self.scheduled.swap(true, Ordering::SeqCst)
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Release the slot as a new connection attempt starts
    pub fn clear(&self) {
        self.scheduled.store(false, Ordering::SeqCst);
    }
}
