use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared between the consumer loop and the workers.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    processed: AtomicU64,
    skipped: AtomicU64,
    dead_lettered: AtomicU64,
    committed: AtomicU64,
}

/// A point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub processed: u64,
    pub skipped: u64,
    pub dead_lettered: u64,
    pub committed: u64,
}

impl StatsSnapshot {
    /// Messages that need no further work.
    pub fn acknowledged(&self) -> u64 {
        self.processed + self.skipped + self.dead_lettered
    }
}

impl IngestStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_committed(&self, count: u64) {
        self.committed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
        }
    }
}
