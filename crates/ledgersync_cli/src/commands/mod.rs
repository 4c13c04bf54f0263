//! CLI command implementations.

pub mod clear;
pub mod inspect;
pub mod pending;

use ledgersync_core::DurableMirror;
use ledgersync_storage::FileBackend;
use std::path::Path;

/// Opens an existing mirror file.
pub fn open_mirror(path: &Path) -> Result<DurableMirror<FileBackend>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No mirror found at {}", path.display()).into());
    }
    let backend = FileBackend::open(path)?;
    Ok(DurableMirror::open(backend)?)
}
