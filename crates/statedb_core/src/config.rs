//! State store configuration.

use statedb_driver::{InsertManyOptions, ReplaceOptions};

use crate::query::DEFAULT_PAGE_SIZE;

/// Configuration for opening a [`StateStore`](crate::StateStore).
///
/// Write options live here, per store, rather than in process-wide statics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection string handed to the connector.
    pub connection_string: String,

    /// Database name.
    pub database: String,

    /// Options for every add, update and soft delete.
    pub replace_options: ReplaceOptions,

    /// Options for [`add_batch`](crate::StateStore::add_batch).
    pub insert_many_options: InsertManyOptions,

    /// Page size used when a caller asks for a non-positive one.
    pub default_page_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: "memory://localhost".to_string(),
            database: "game".to_string(),
            replace_options: ReplaceOptions::upsert(),
            insert_many_options: InsertManyOptions::unordered(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given server and database.
    #[must_use]
    pub fn new(connection_string: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Sets the replace options.
    #[must_use]
    pub const fn replace_options(mut self, options: ReplaceOptions) -> Self {
        self.replace_options = options;
        self
    }

    /// Sets the bulk insert options.
    #[must_use]
    pub const fn insert_many_options(mut self, options: InsertManyOptions) -> Self {
        self.insert_many_options = options;
        self
    }

    /// Sets the fallback page size. Zero is treated as one.
    #[must_use]
    pub const fn default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }
}
