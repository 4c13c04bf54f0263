//! # ledgersync testkit
//!
//! Test utilities for ledgersync.
//!
//! This crate provides:
//! - Finance fixture entities (keywords, category groups, event categories)
//! - In-memory and file-backed mirror helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledgersync_testkit::prelude::*;
//!
//! #[test]
//! fn keyword_roundtrip() {
//!     let mirror = memory_mirror();
//!     let entity = confirmed("7", Keyword::new("Rent"));
//!     mirror.upsert(&entity, false).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
