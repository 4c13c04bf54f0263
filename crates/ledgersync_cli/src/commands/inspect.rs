//! Inspect command implementation.

use super::open_mirror;
use ledgersync_core::DurableMirror;
use ledgersync_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Mirror inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Mirror path.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Total number of records.
    pub record_count: usize,
    /// Number of pending records.
    pub pending_count: usize,
    /// Per entity type statistics.
    pub kinds: Vec<KindStats>,
}

/// Statistics for one entity type.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KindStats {
    /// Entity type.
    pub kind: String,
    /// Number of records.
    pub records: usize,
    /// Number of pending records.
    pub pending: usize,
    /// Number of soft-deleted records.
    pub inactive: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mirror = open_mirror(path)?;
    let result = inspect(path, &mirror)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Gathers statistics for an open mirror.
pub fn inspect(
    path: &Path,
    mirror: &DurableMirror<FileBackend>,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut kinds: BTreeMap<String, KindStats> = BTreeMap::new();
    for record in mirror.all_records() {
        let stats = kinds
            .entry(record.key.kind.clone())
            .or_insert_with(|| KindStats {
                kind: record.key.kind.clone(),
                records: 0,
                pending: 0,
                inactive: 0,
            });
        stats.records += 1;
        if record.pending {
            stats.pending += 1;
        }
        if !record.active {
            stats.inactive += 1;
        }
    }

    let kinds: Vec<KindStats> = kinds.into_values().collect();
    Ok(InspectResult {
        path: path.display().to_string(),
        size: mirror.backend().size()?,
        record_count: kinds.iter().map(|k| k.records).sum(),
        pending_count: kinds.iter().map(|k| k.pending).sum(),
        kinds,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Mirror: {}", result.path);
    println!("Size: {} bytes", result.size);
    println!("Records: {}", result.record_count);
    println!("Pending: {}", result.pending_count);

    if !result.kinds.is_empty() {
        println!();
        println!("{:<24} {:>8} {:>8} {:>8}", "KIND", "RECORDS", "PENDING", "INACTIVE");
        for kind in &result.kinds {
            println!(
                "{:<24} {:>8} {:>8} {:>8}",
                kind.kind, kind.records, kind.pending, kind.inactive
            );
        }
    }
}
