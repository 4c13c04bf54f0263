//! Error types for the sync engine.

use ledgersync_protocol::{ProtocolError, RemoteFailure};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Local state error (mirror, working set, decoding).
    #[error("local state error: {0}")]
    Core(#[from] ledgersync_core::CoreError),

    /// Wire codec error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote authority failed the call.
    #[error("remote error: {0}")]
    Remote(RemoteFailure),

    /// The remote call did not complete within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The operation was cancelled or superseded.
    #[error("sync cancelled")]
    Cancelled,

    /// A submission for the same record has not resolved yet.
    #[error("submission already in flight for {kind} {id}")]
    SubmissionInFlight {
        /// Entity type.
        kind: String,
        /// Entity id.
        id: String,
    },
}

impl SyncError {
    /// Returns true for cancellation, which must never alert the user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    /// Returns true for failures of the remote call itself.
    ///
    /// These leave the pending marker set and are retried on the next save
    /// or drain.
    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Remote(_) | SyncError::Timeout)
    }
}

impl From<RemoteFailure> for SyncError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::Cancelled => SyncError::Cancelled,
            RemoteFailure::Timeout => SyncError::Timeout,
            other => SyncError::Remote(other),
        }
    }
}
