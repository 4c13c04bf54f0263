//! File-based storage backend for persistent mirrors.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file-based storage backend.
///
/// The image lives in a single file. `replace` writes the new image to a
/// sibling `*.tmp` file, syncs it, and renames it over the original, so a
/// crash at any point leaves either the old or the new image on disk.
///
/// # Durability
///
/// - the temporary file is `sync_all`ed before the rename
/// - on unix the parent directory is synced after the rename
///
/// # Thread Safety
///
/// Writers are serialized by an internal lock.
///
/// # Example
///
/// ```no_run
/// use ledgersync_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("mirror.cbor")).unwrap();
/// backend.replace(b"persistent image").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The file itself is created lazily on the first `replace`. A stale
    /// temporary file left by an interrupted write is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the stale temporary file cannot be removed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let backend = Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        };

        let tmp = backend.tmp_path();
        match fs::remove_file(&tmp) {
            Ok(()) => debug!(path = %tmp.display(), "removed interrupted mirror write"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(backend)
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the image file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, image: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let tmp = self.tmp_path();

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(image)?;
            file.sync_all()?;
        }

        fs::rename(&tmp, &self.path)?;
        self.sync_parent()?;
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => self.sync_parent(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
