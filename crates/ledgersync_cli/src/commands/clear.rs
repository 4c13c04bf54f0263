//! Clear command implementation.

use super::open_mirror;
use std::path::Path;
use tracing::{info, warn};

/// Runs the clear command.
pub fn run(path: &Path, confirmed: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirmed {
        return Err("Refusing to clear the mirror without --yes".into());
    }

    let mirror = open_mirror(path)?;
    let removed = mirror.len();
    let pending = mirror.pending(None).len();
    if pending > 0 {
        warn!(pending, "discarding records that were never confirmed");
    }

    mirror.delete_all()?;
    info!(removed, "mirror cleared");
    println!("Removed {removed} records");
    Ok(())
}
