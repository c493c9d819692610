use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the resolving workers and the sink
#[derive(Default)]
pub struct RunStats {
    pub identifiers_resolved: AtomicU64,
    pub identifiers_unmatched: AtomicU64,
    pub rows_written: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_resolved(&self) {
        self.identifiers_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unmatched(&self) {
        self.identifiers_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of rows written including this one.
    pub fn inc_written(&self) -> u64 {
        self.rows_written.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn resolved(&self) -> u64 {
        self.identifiers_resolved.load(Ordering::Relaxed)
    }

    pub fn unmatched(&self) -> u64 {
        self.identifiers_unmatched.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }
}
