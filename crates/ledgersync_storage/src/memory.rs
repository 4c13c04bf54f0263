//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory storage backend.
///
/// Clones share the same image, so a test can drop a mirror, keep a clone of
/// its backend, and reopen a new mirror over it to simulate a restart.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use ledgersync_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// let reopened = backend.clone();
/// backend.replace(b"state").unwrap();
/// assert_eq!(reopened.size().unwrap(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    image: Arc<RwLock<Option<Vec<u8>>>>,
    reject_next: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend holding a pre-existing image.
    ///
    /// Useful for testing recovery and corruption scenarios.
    #[must_use]
    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            image: Arc::new(RwLock::new(Some(image))),
            reject_next: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the next `replace` fail without touching the stored image.
    pub fn reject_next_replace(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.image.read().clone())
    }

    fn replace(&self, image: &[u8]) -> StorageResult<()> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("scripted failure".into()));
        }
        *self.image.write() = Some(image.to_vec());
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        *self.image.write() = None;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.image.read().as_ref().map_or(0, |image| image.len() as u64))
    }
}
