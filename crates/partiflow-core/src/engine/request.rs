use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out evaluation tickets for one pipeline and tracks which one is current.
///
/// The tracker is cheap to clone and can be moved to other threads, e.g. to an
/// editor that supersedes a running evaluation after a parameter change.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    generation: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every previously issued ticket.
    pub fn begin(&self) -> RequestTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Marks every outstanding ticket as stale.
    pub fn supersede(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Identifies one evaluation request. A ticket stays current until its
/// tracker begins a newer request or is told to supersede.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl RequestTicket {
    /// A ticket that is never superseded.
    pub fn detached() -> Self {
        RequestTracker::new().begin()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}
