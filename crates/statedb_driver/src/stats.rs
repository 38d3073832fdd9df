//! Driver operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for operations that reached the in-memory server.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct DriverStats {
    /// Find and count calls.
    reads: AtomicU64,
    /// Insert and replace calls.
    writes: AtomicU64,
    /// Physical delete calls.
    deletes: AtomicU64,
    /// Index list/create/drop calls.
    index_operations: AtomicU64,
    /// Canonical bytes of documents written.
    bytes_written: AtomicU64,
}

impl DriverStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_index_operation(&self) {
        self.index_operations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of find and count calls.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of insert and replace calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of physical delete calls.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of index operations.
    pub fn index_operations(&self) -> u64 {
        self.index_operations.load(Ordering::Relaxed)
    }

    /// Returns the total canonical bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }
}
