//! Driver trait definitions.

use std::sync::Arc;

use async_trait::async_trait;
use statedb_codec::Value;

use crate::error::DriverResult;
use crate::filter::Filter;
use crate::index::{IndexInfo, IndexModel};
use crate::options::{FindOptions, InsertManyOptions, InsertManyResult, ReplaceOptions, ReplaceResult};

/// A handle to one collection of documents.
///
/// Documents are [`Value::Map`]s keyed by the integer field
/// [`ID_FIELD`](crate::ID_FIELD). At most one document exists per id.
///
/// # Invariants
///
/// - `insert_*` never overwrites: an existing id fails with
///   [`DuplicateKey`](crate::DriverError::DuplicateKey)
/// - `replace_one` never changes a document's id
/// - every operation fails with [`Closed`](crate::DriverError::Closed) once
///   the owning driver is closed
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// The collection name.
    fn name(&self) -> &str;

    /// Returns matching documents, sorted, skipped and limited per `options`.
    async fn find(&self, filter: &Filter, options: &FindOptions) -> DriverResult<Vec<Value>>;

    /// Counts matching documents.
    async fn count(&self, filter: &Filter) -> DriverResult<u64>;

    /// Inserts one document.
    async fn insert_one(&self, document: Value) -> DriverResult<i64>;

    /// Inserts many documents.
    ///
    /// Per-document failures are reported in the result, not as an `Err`.
    /// An `Err` means the whole call failed (for example a closed driver).
    async fn insert_many(
        &self,
        documents: Vec<Value>,
        options: &InsertManyOptions,
    ) -> DriverResult<InsertManyResult>;

    /// Replaces the first matching document, or inserts when `options.upsert`
    /// is set and nothing matches.
    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Value,
        options: &ReplaceOptions,
    ) -> DriverResult<ReplaceResult>;

    /// Physically removes the first matching document. Returns the number removed.
    async fn delete_one(&self, filter: &Filter) -> DriverResult<u64>;

    /// Physically removes every matching document. Returns the number removed.
    async fn delete_many(&self, filter: &Filter) -> DriverResult<u64>;

    /// Lists the collection's indexes.
    async fn list_indexes(&self) -> DriverResult<Vec<IndexInfo>>;

    /// Creates an index and returns its name.
    async fn create_index(&self, model: IndexModel) -> DriverResult<String>;

    /// Drops an index by name.
    async fn drop_index(&self, name: &str) -> DriverResult<()>;
}

/// A connection to one database.
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    /// The database name.
    fn database(&self) -> &str;

    /// Returns a handle to the named collection, creating it if needed.
    async fn collection(&self, name: &str) -> DriverResult<Arc<dyn DocumentCollection>>;

    /// Lists existing collection names.
    async fn list_collections(&self) -> DriverResult<Vec<String>>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DriverResult<()>;

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&self) -> DriverResult<()>;

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Opens driver connections from a connection string.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `database` on the server named by `connection_string`.
    async fn connect(
        &self,
        connection_string: &str,
        database: &str,
    ) -> DriverResult<Arc<dyn DocumentDriver>>;
}
