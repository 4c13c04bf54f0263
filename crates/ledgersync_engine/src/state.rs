//! Outcomes and counters reported by the coordinator.

/// What a submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing changed since the last checkpoint; no I/O happened.
    Unchanged,
    /// A required field was blank; the edit was restored from the shadow.
    Reverted,
    /// A never-confirmed record was blank and was dropped locally.
    Discarded,
    /// The remote authority confirmed a creation.
    Created {
        /// The temporary id the record had.
        temp_id: String,
        /// The server-issued id it has now.
        server_id: String,
    },
    /// The remote authority confirmed an edit.
    Updated {
        /// Entity id.
        id: String,
    },
    /// The record was deleted.
    Deleted {
        /// Entity id.
        id: String,
    },
}

impl SubmitOutcome {
    /// The id the record has after the submission, if it still exists.
    pub fn current_id(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Created { server_id, .. } => Some(server_id),
            SubmitOutcome::Updated { id } => Some(id),
            _ => None,
        }
    }
}

/// Result of draining pending mirror records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records resubmitted and confirmed.
    pub submitted: usize,
    /// Records that failed again (still pending) or could not be read.
    pub failed: usize,
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Submissions attempted.
    pub submissions: u64,
    /// Submissions skipped because nothing changed.
    pub skipped: u64,
    /// Creations confirmed.
    pub created: u64,
    /// Edits confirmed.
    pub updated: u64,
    /// Deletions completed.
    pub deleted: u64,
    /// Remote calls that failed.
    pub failed: u64,
    /// Edits reverted by the blank-field guard.
    pub reverted: u64,
    /// Unconfirmed records discarded by the blank-field guard.
    pub discarded: u64,
    /// Collection refreshes applied.
    pub refreshes: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_id_follows_outcome() {
        let created = SubmitOutcome::Created {
            temp_id: "tmp-1".into(),
            server_id: "42".into(),
        };
        assert_eq!(created.current_id(), Some("42"));
        assert_eq!(
            SubmitOutcome::Deleted { id: "42".into() }.current_id(),
            None
        );
        assert_eq!(SubmitOutcome::Unchanged.current_id(), None);
    }
}
