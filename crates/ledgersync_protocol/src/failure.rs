//! Typed failures of a remote call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a remote call did not succeed.
///
/// Cancellation is kept apart from every other failure: a cancelled call was
/// superseded on purpose and must never alert the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RemoteFailure {
    /// The call was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The remote authority answered with a non-success status.
    #[error("remote returned status {code}: {message}")]
    Status {
        /// Status code.
        code: u16,
        /// Message from the remote authority.
        message: String,
    },

    /// The request never reached the remote authority.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote authority's answer could not be used.
    #[error("reply rejected: {0}")]
    Rejected(String),
}

impl RemoteFailure {
    /// Returns true if the call was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RemoteFailure::Cancelled)
    }

    /// Creates a status failure.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}
