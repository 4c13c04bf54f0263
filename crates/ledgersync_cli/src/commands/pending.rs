//! Pending command implementation.

use super::open_mirror;
use ledgersync_core::MirrorRecord;
use serde::Serialize;
use std::path::Path;

/// One record awaiting confirmation.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PendingEntry {
    /// Entity type.
    pub kind: String,
    /// Entity id.
    pub id: String,
    /// Requested action.
    pub action: String,
    /// Soft-delete flag.
    pub active: bool,
}

impl From<&MirrorRecord> for PendingEntry {
    fn from(record: &MirrorRecord) -> Self {
        Self {
            kind: record.key.kind.clone(),
            id: record.key.id.clone(),
            action: record.action.to_string(),
            active: record.active,
        }
    }
}

/// Runs the pending command.
pub fn run(path: &Path, kind: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mirror = open_mirror(path)?;
    let entries: Vec<PendingEntry> = mirror.pending(kind).iter().map(PendingEntry::from).collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            if entries.is_empty() {
                println!("No pending records");
                return Ok(());
            }
            println!("{:<24} {:<40} {:<8} {}", "KIND", "ID", "ACTION", "ACTIVE");
            for entry in &entries {
                println!(
                    "{:<24} {:<40} {:<8} {}",
                    entry.kind, entry.id, entry.action, entry.active
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::{Action, MirrorKey};

    #[test]
    fn entry_shows_requested_action() {
        let mut record = MirrorRecord::new(MirrorKey::new("keyword", "7"));
        record.pending = true;
        record.action = Action::Delete;

        let entry = PendingEntry::from(&record);
        assert_eq!(
            entry,
            PendingEntry {
                kind: "keyword".into(),
                id: "7".into(),
                action: "delete".into(),
                active: true,
            }
        );
    }
}
