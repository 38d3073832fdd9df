//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding, decoding or serde conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A serde type could not be converted into a document value.
    #[error("serialization failed: {message}")]
    SerializeFailed {
        /// Description of the serialization error.
        message: String,
    },

    /// A document value could not be converted into a serde type.
    #[error("deserialization failed: {message}")]
    DeserializeFailed {
        /// Description of the deserialization error.
        message: String,
    },

    /// NaN values have no canonical encoding.
    #[error("NaN values are forbidden")]
    NaNForbidden,

    /// Floats must be encoded as 64-bit doubles.
    #[error("non-canonical float width: only 64-bit floats are accepted")]
    FloatWidth,

    /// Indefinite-length items are forbidden.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid CBOR structure.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Unsupported CBOR type.
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// Integer does not fit the signed 64-bit document range.
    #[error("integer overflow")]
    IntegerOverflow,

    /// A length prefix claims more data than the decoder accepts.
    #[error("size limit exceeded: claimed {claimed}, max allowed {max_allowed}")]
    SizeLimitExceeded {
        /// The claimed length.
        claimed: u64,
        /// The configured maximum.
        max_allowed: u64,
    },
}

impl CodecError {
    /// Create a serialization failed error.
    pub fn serialize_failed(message: impl Into<String>) -> Self {
        Self::SerializeFailed {
            message: message.into(),
        }
    }

    /// Create a deserialization failed error.
    pub fn deserialize_failed(message: impl Into<String>) -> Self {
        Self::DeserializeFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}
