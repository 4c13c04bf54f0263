//! # ledgersync storage
//!
//! Byte-image storage backends for the ledgersync durable mirror.
//!
//! A backend holds exactly one opaque image: the last committed state of the
//! mirror. Backends do not interpret the bytes; `ledgersync_core` owns the
//! encoding.
//!
//! ## Design Principles
//!
//! - One image per backend, replaced as a whole
//! - `replace` is atomic: after a crash the backend holds either the old
//!   image or the new one, never a mix
//! - Must be `Send + Sync`; the mirror shares one backend across entity types
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral mirrors
//! - [`FileBackend`] - For persistent mirrors using write-then-rename
//!
//! ## Example
//!
//! ```rust
//! use ledgersync_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.replace(b"image v1").unwrap();
//! assert_eq!(backend.load().unwrap().as_deref(), Some(&b"image v1"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
