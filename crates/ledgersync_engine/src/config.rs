//! Configuration for the sync coordinator.

use ledgersync_core::SyncContext;
use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account, user and device stamped into every request.
    pub context: SyncContext,
    /// Upper bound on a single remote call.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(context: SyncContext) -> Self {
        Self {
            context,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the remote call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
