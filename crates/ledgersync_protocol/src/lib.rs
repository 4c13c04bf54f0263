//! # ledgersync protocol
//!
//! Wire types exchanged with the remote authority.
//!
//! This crate provides:
//! - [`RemoteRequest`], the envelope submitted for one entity mutation
//! - [`RemoteAck`], the success body (carrying a server id for creations)
//! - [`FetchRequest`] / [`FetchResponse`] for full-collection fetches
//! - [`RemoteFailure`], the typed failure a remote call can return
//! - CBOR encoding/decoding via [`WireMessage`]
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod failure;
mod messages;

pub use codec::WireMessage;
pub use error::{ProtocolError, ProtocolResult};
pub use failure::RemoteFailure;
pub use messages::{FetchRequest, FetchResponse, RemoteAck, RemoteRecord, RemoteRequest};
