//! User-facing notices.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Something the user should be told about.
///
/// Notices are transient and non-blocking. Cancellation never produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A required field was left blank; the edit was reverted.
    Validation {
        /// Entity type.
        kind: String,
        /// Entity id.
        id: String,
        /// What was wrong.
        message: String,
    },
    /// A submission failed; it stays pending and will be retried.
    WillRetryLater {
        /// Entity type.
        kind: String,
        /// Entity id.
        id: String,
    },
    /// A full-collection fetch failed.
    FetchFailed {
        /// Entity type.
        kind: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Validation { message, .. } => f.write_str(message),
            Notice::WillRetryLater { kind, .. } => {
                write!(f, "Could not save {kind}; will try again later")
            }
            Notice::FetchFailed { kind } => write!(f, "Could not refresh {kind} list"),
        }
    }
}

/// Receives notices for display.
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    fn notify(&self, notice: Notice);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}

/// Logs notices through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Validation { kind, id, .. } => info!(kind, id, %notice, "validation notice"),
            Notice::WillRetryLater { kind, id } => warn!(kind, id, %notice, "will retry later"),
            Notice::FetchFailed { kind } => warn!(kind, %notice, "fetch failed"),
        }
    }
}

/// Collects notices in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Number of notices received.
    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }

    /// Removes and returns every notice.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
