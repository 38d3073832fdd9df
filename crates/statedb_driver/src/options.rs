//! Operation options and write results.

use crate::error::DriverError;
use crate::filter::SortSpec;

/// Options for a find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys, applied in order.
    pub sort: Vec<SortSpec>,
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Creates options with no sort, skip or limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sort key.
    #[must_use]
    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    /// Sets the skip count.
    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Options for a replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Insert the replacement when nothing matches.
    pub upsert: bool,
}

impl ReplaceOptions {
    /// Replace-or-insert options.
    #[must_use]
    pub const fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Options for a bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertManyOptions {
    /// Stop at the first failing document.
    ///
    /// When false every document is attempted and failures are reported
    /// individually.
    pub ordered: bool,
}

impl InsertManyOptions {
    /// Unordered execution.
    #[must_use]
    pub const fn unordered() -> Self {
        Self { ordered: false }
    }
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

/// Outcome of a replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceResult {
    /// Whether the server acknowledged the write. Counts are zero when not.
    pub acknowledged: bool,
    /// Number of documents matched by the filter.
    pub matched: u64,
    /// Number of documents whose content actually changed.
    pub modified: u64,
    /// Id of the inserted document when the upsert created one.
    pub upserted_id: Option<i64>,
}

impl ReplaceResult {
    /// Documents written: modified plus upserted.
    pub fn written(&self) -> u64 {
        self.modified + u64::from(self.upserted_id.is_some())
    }
}

/// A single failed document in a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    /// Why it failed.
    pub error: DriverError,
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertManyResult {
    /// Whether the server acknowledged the write.
    pub acknowledged: bool,
    /// Ids of the inserted documents, in batch order.
    pub inserted_ids: Vec<i64>,
    /// Documents that failed.
    pub failures: Vec<BulkWriteFailure>,
}

impl InsertManyResult {
    /// True when every submitted document was inserted.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
