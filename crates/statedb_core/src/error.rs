//! Error types for the state store.

use statedb_codec::CodecError;
use statedb_driver::DriverError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in state store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The document database reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// A state could not be converted to or from a document.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Two state types claim the same collection name.
    #[error("collection {collection} is already used by {existing}, cannot register {requested}")]
    CollectionConflict {
        /// The contested collection name.
        collection: &'static str,
        /// Type name that registered first.
        existing: &'static str,
        /// Type name that tried to register second.
        requested: &'static str,
    },

    /// Some documents of a bulk insert failed; the rest were inserted.
    #[error("{failed} of {total} states failed to insert into {collection}: {first_error}")]
    BatchPartiallyFailed {
        /// The target collection.
        collection: &'static str,
        /// Number of failed states.
        failed: usize,
        /// Number of submitted states.
        total: usize,
        /// The first failure, for diagnostics.
        first_error: DriverError,
    },

    /// Operation not permitted with the given input.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether the error came from a closed driver.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Driver(DriverError::Closed))
    }
}
