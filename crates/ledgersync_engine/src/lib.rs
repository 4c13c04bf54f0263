//! # ledgersync engine
//!
//! The optimistic submit protocol and collection reconciliation for
//! ledgersync.
//!
//! This crate provides:
//! - [`SyncCoordinator`]: mirror-write, remote call, then commit or keep
//!   pending, one submission per record at a time
//! - [`CollectionReconciler`]: tombstone-by-absence merge of a full fetch
//! - Cold-start drain of pending mirror records
//! - The [`RemoteAuthority`] abstraction, with an HTTP implementation over a
//!   pluggable [`HttpClient`] and an in-memory [`MockAuthority`]
//! - User-facing [`Notice`]s through a [`Notifier`]
//!
//! ## Architecture
//!
//! Three stores hold each record: the in-memory [`WorkingSet`] a UI binds
//! to, the crash-safe [`DurableMirror`], and the remote authority, which is
//! the source of truth. A mutation is persisted to the mirror as pending
//! before any network call, so a crash at any later point is recoverable by
//! [`SyncCoordinator::drain_pending`].
//!
//! ## Key Invariants
//!
//! - Write-before-send: the pending mirror record exists before the request
//! - No two submissions for one record are in flight
//! - A failure never clears the pending marker and never retries on its own
//! - Cancellation is silent
//! - A refresh applies completely or not at all
//!
//! [`WorkingSet`]: ledgersync_core::WorkingSet
//! [`DurableMirror`]: ledgersync_core::DurableMirror

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod http;
mod notify;
mod reconciler;
mod remote;
mod state;

pub use config::SyncConfig;
pub use coordinator::SyncCoordinator;
pub use error::{SyncError, SyncResult};
pub use http::{HttpAuthority, HttpClient, HttpResponse};
pub use notify::{Notice, Notifier, RecordingNotifier, TracingNotifier};
pub use reconciler::{CollectionReconciler, ReconcileReport};
pub use remote::{MockAuthority, RemoteAuthority};
pub use state::{DrainReport, SubmitOutcome, SyncStats};
