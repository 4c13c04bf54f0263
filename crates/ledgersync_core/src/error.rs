//! Error types for ledgersync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] ledgersync_storage::StorageError),

    /// A value could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored or received value could not be decoded.
    #[error("cannot decode {field}: {message}")]
    Decode {
        /// The field or structure being decoded.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// An entity with this id already exists in the working set.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Entity type.
        kind: String,
        /// The conflicting id.
        id: String,
    },

    /// Entity not found.
    #[error("{kind} {id} not found")]
    EntityNotFound {
        /// Entity type.
        kind: String,
        /// The id that was not found.
        id: String,
    },
}

impl CoreError {
    /// Creates a decode error.
    pub fn decode(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an entity not found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}
