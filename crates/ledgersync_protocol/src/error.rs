//! Error types for the wire codec.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A message could not be encoded.
    #[error("failed to encode {message}: {reason}")]
    Encode {
        /// Message type.
        message: &'static str,
        /// Underlying codec error.
        reason: String,
    },

    /// Bytes did not decode as the expected message.
    #[error("failed to decode {message}: {reason}")]
    Decode {
        /// Message type.
        message: &'static str,
        /// Underlying codec error.
        reason: String,
    },
}
