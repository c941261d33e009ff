//! Request generations for last-call-wins loading.
//!
//! Each new load takes a [`LoadTicket`] from a shared [`LoadGeneration`].
//! Issuing a ticket makes every earlier ticket stale, so results from a
//! superseded load can be recognized and dropped by whoever stores them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing load counter shared by all callers.
#[derive(Debug, Clone, Default)]
pub struct LoadGeneration {
    counter: Arc<AtomicU64>,
}

impl LoadGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding all earlier tickets.
    pub fn issue(&self) -> LoadTicket {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket {
            generation,
            counter: Arc::clone(&self.counter),
        }
    }

    /// The most recently issued generation (0 before the first ticket).
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Token identifying one load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check that no newer ticket has been issued.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}
