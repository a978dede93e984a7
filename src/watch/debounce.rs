// src/watch/debounce.rs

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Coalescing trigger slot for one binding.
///
/// Any number of [`mark`](Self::mark) calls while no one is consuming
/// collapse into a single pending trigger, so N change events arriving
/// during an in-flight run schedule exactly one follow-up run, never N.
#[derive(Debug, Default)]
pub struct TriggerCell {
    dirty: AtomicBool,
    notify: Notify,
}

impl TriggerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trigger. Idempotent while one is already pending.
    pub fn mark(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    /// Wait until at least one trigger is pending, then consume it.
    pub async fn triggered(&self) {
        loop {
            if self.dirty.swap(false, Ordering::SeqCst) {
                return;
            }
            // A stale permit can wake us once with the flag clear; the loop
            // re-checks and parks again.
            self.notify.notified().await;
        }
    }

    /// Consume a pending trigger without waiting, if there is one. Used to
    /// absorb event bursts inside the settle window.
    pub fn take_pending(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// True if a trigger is pending but not yet consumed.
    pub fn is_pending(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}
