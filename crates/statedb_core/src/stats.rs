//! State store counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// State store statistics.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// States returned by loads and finds.
    loads: AtomicU64,
    /// Writes sent to the driver (add, update, soft delete, batch).
    writes: AtomicU64,
    /// Updates skipped because the state was unchanged.
    skipped_updates: AtomicU64,
    /// Soft deletes written.
    soft_deletes: AtomicU64,
    /// Documents physically removed.
    hard_deletes: AtomicU64,
    /// States that failed inside a bulk insert.
    batch_failures: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    /// States returned by loads and finds.
    pub loads: u64,
    /// Writes sent to the driver.
    pub writes: u64,
    /// Updates skipped because the state was unchanged.
    pub skipped_updates: u64,
    /// Soft deletes written.
    pub soft_deletes: u64,
    /// Documents physically removed.
    pub hard_deletes: u64,
    /// States that failed inside a bulk insert.
    pub batch_failures: u64,
}

impl StoreStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_loads(&self, count: u64) {
        self.loads.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_update(&self) {
        self.skipped_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_soft_delete(&self) {
        self.soft_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hard_deletes(&self, count: u64) {
        self.hard_deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_failures(&self, count: u64) {
        self.batch_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the number of states loaded.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Returns the number of writes sent to the driver.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of skipped (clean) updates.
    pub fn skipped_updates(&self) -> u64 {
        self.skipped_updates.load(Ordering::Relaxed)
    }

    /// Returns the number of soft deletes.
    pub fn soft_deletes(&self) -> u64 {
        self.soft_deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of physically removed documents.
    pub fn hard_deletes(&self) -> u64 {
        self.hard_deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of states that failed in bulk inserts.
    pub fn batch_failures(&self) -> u64 {
        self.batch_failures.load(Ordering::Relaxed)
    }

    /// Takes a snapshot of all counters.
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            loads: self.loads(),
            writes: self.writes(),
            skipped_updates: self.skipped_updates(),
            soft_deletes: self.soft_deletes(),
            hard_deletes: self.hard_deletes(),
            batch_failures: self.batch_failures(),
        }
    }
}
