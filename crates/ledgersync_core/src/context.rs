//! Explicit identity context for submissions.

use serde::{Deserialize, Serialize};

/// Who is making changes, from which device, on which account.
///
/// Passed explicitly to everything that stamps audit fields or builds a
/// request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncContext {
    /// Account the collections belong to.
    pub account_id: String,
    /// User recorded in `entered_by` / `updated_by`.
    pub user: String,
    /// Identifier of this device.
    pub device_id: String,
}

impl SyncContext {
    /// Creates a new context.
    pub fn new(
        account_id: impl Into<String>,
        user: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            user: user.into(),
            device_id: device_id.into(),
        }
    }
}
