//! # ledgersync core
//!
//! The identity, snapshot and persistence layer of the ledgersync
//! local-first synchronization core.
//!
//! This crate provides:
//! - The [`Synchronizable`] contract an entity payload implements
//! - [`Entity`], a payload plus id, [`Action`], soft-delete flag and audit fields
//! - [`ShadowSnapshot`] for change detection and rollback
//! - [`WorkingSet`], the per-type in-memory collection a UI binds to
//! - [`DurableMirror`], the crash-safe local copy of every entity
//!
//! Nothing in this crate performs network I/O; see `ledgersync_engine` for
//! the submit protocol and collection reconciliation.
//!
//! ## Key Invariants
//!
//! - The working set, the mirror and the shadow agree on an entity's id
//! - No two entities in a working set share an id
//! - Shadow comparison is pure and never touches storage
//! - Every mirror change happens inside one atomic transaction

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod context;
mod entity;
mod error;
mod mirror;
mod shadow;
mod working_set;

pub use context::SyncContext;
pub use entity::{
    is_temporary_id, parse_date, temporary_id, Action, AuditInfo, Entity, EntityRef,
    ForeignKeyStub, Synchronizable, TEMP_ID_PREFIX,
};
pub use error::{CoreError, CoreResult};
pub use mirror::{DurableMirror, MirrorKey, MirrorRecord, MirrorTransaction, MIRROR_FORMAT_VERSION};
pub use shadow::ShadowSnapshot;
pub use working_set::WorkingSet;
