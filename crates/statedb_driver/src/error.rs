//! Error types for driver operations.

use statedb_codec::CodecError;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a document database driver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// The connection string could not be used.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        /// Description of the failure.
        message: String,
    },

    /// The driver has been closed.
    #[error("driver is closed")]
    Closed,

    /// A document with the same id already exists.
    #[error("duplicate key: collection {collection}, id {id}")]
    DuplicateKey {
        /// The collection name.
        collection: String,
        /// The conflicting id.
        id: i64,
    },

    /// A document has no integer `id` field.
    #[error("document in collection {collection} has no integer id")]
    MissingId {
        /// The collection name.
        collection: String,
    },

    /// A document is not a map, or tries to change its id.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// An index with the same name already exists.
    #[error("index already exists: {name}")]
    IndexExists {
        /// The index name.
        name: String,
    },

    /// The named index does not exist.
    #[error("index not found: {name}")]
    IndexNotFound {
        /// The index name.
        name: String,
    },

    /// A collection name is empty or uses a reserved character.
    #[error("invalid collection name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// The named collection does not exist.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// The collection name.
        name: String,
    },

    /// A document failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl DriverError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}
