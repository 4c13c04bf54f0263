//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend for the durable mirror.
///
/// Backends are **opaque image stores**. The mirror serializes its whole
/// committed state into one image and hands it to [`replace`]; on startup it
/// reads it back with [`load`].
///
/// # Invariants
///
/// - `load` returns exactly the bytes of the last successful `replace`
/// - `replace` is atomic with respect to process death
/// - `clear` removes the image; a subsequent `load` returns `None`
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
///
/// [`replace`]: StorageBackend::replace
/// [`load`]: StorageBackend::load
pub trait StorageBackend: Send + Sync {
    /// Reads the current image.
    ///
    /// Returns `None` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the image exists but cannot be read.
    fn load(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the stored image.
    ///
    /// After this returns successfully the new image is durable and will be
    /// returned by every later `load`, including after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the image could not be made durable. The previous
    /// image is left intact in that case.
    fn replace(&self, image: &[u8]) -> StorageResult<()>;

    /// Removes the stored image.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn clear(&self) -> StorageResult<()>;

    /// Returns the size of the current image in bytes (0 if none).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;
}
