//! The remote authority: the source of truth entities are submitted to.

use ledgersync_core::{Action, CoreResult, Entity, Synchronizable};
use ledgersync_protocol::{FetchRequest, RemoteAck, RemoteFailure, RemoteRecord, RemoteRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// The remote side of the submit and fetch protocol.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-memory for testing, etc.). Methods use
/// return-position `impl Future + Send` so implementations can be written as
/// plain `async fn`.
pub trait RemoteAuthority: Send + Sync {
    /// Submits one mutation.
    ///
    /// A successful creation carries the newly assigned id in the ack.
    fn send(
        &self,
        request: RemoteRequest,
    ) -> impl Future<Output = Result<RemoteAck, RemoteFailure>> + Send;

    /// Fetches the full membership of one collection.
    fn fetch_all(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<RemoteRecord>, RemoteFailure>> + Send;
}

/// An in-memory remote authority for tests and demos.
///
/// Issues sequential numeric ids, keeps records per entity type in insertion
/// order, logs every request and can be scripted to fail the next call.
#[derive(Debug)]
pub struct MockAuthority {
    next_id: AtomicU64,
    collections: Mutex<HashMap<String, Vec<RemoteRecord>>>,
    requests: Mutex<Vec<RemoteRequest>>,
    fetches: AtomicU64,
    fail_next: Mutex<Option<RemoteFailure>>,
    delay: Mutex<Option<Duration>>,
}

impl Default for MockAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthority {
    /// Creates an empty authority issuing ids from 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an empty authority issuing ids from `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
            collections: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            fetches: AtomicU64::new(0),
            fail_next: Mutex::new(None),
            delay: Mutex::new(None),
        }
    }

    /// Makes the next call (send or fetch) fail with `failure`.
    pub fn fail_next(&self, failure: RemoteFailure) {
        *self.fail_next.lock() = Some(failure);
    }

    /// Delays every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Stores a record as if another client had created it.
    pub fn seed(&self, kind: &str, record: RemoteRecord) {
        let mut collections = self.collections.lock();
        let records = collections.entry(kind.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Stores a confirmed entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn seed_entity<P: Synchronizable>(&self, entity: &Entity<P>) -> CoreResult<()> {
        self.seed(P::KIND, RemoteRecord::from_entity(entity)?);
        Ok(())
    }

    /// Removes a record as if another client had deleted it.
    pub fn remove(&self, kind: &str, id: &str) -> bool {
        let mut collections = self.collections.lock();
        let Some(records) = collections.get_mut(kind) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    /// Current records of one type.
    pub fn records(&self, kind: &str) -> Vec<RemoteRecord> {
        self.collections
            .lock()
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks up one record.
    pub fn record(&self, kind: &str, id: &str) -> Option<RemoteRecord> {
        self.collections
            .lock()
            .get(kind)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
    }

    /// Every mutation request received so far.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().clone()
    }

    /// Number of mutation requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of fetches received.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn before_call(&self) -> Result<(), RemoteFailure> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_next.lock().take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn apply(&self, request: &RemoteRequest) -> Result<RemoteAck, RemoteFailure> {
        let mut collections = self.collections.lock();
        let records = collections.entry(request.kind.clone()).or_default();

        match request.action {
            Action::Add => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
                records.push(RemoteRecord {
                    id: id.clone(),
                    active: request.active,
                    payload: request.payload.clone(),
                    entered_by: request.user.clone(),
                    updated_by: request.user.clone(),
                    entered_date: request.entered_date.clone(),
                    updated_date: request.updated_date.clone(),
                });
                Ok(RemoteAck::created(id))
            }
            Action::Edit => {
                let record = records
                    .iter_mut()
                    .find(|r| r.id == request.entity_id)
                    .ok_or_else(|| not_found(request))?;
                record.active = request.active;
                record.payload = request.payload.clone();
                record.updated_by = request.user.clone();
                record.updated_date = request.updated_date.clone();
                Ok(RemoteAck::ok()
                    .with_update_stamp(request.user.clone(), request.updated_date.clone()))
            }
            Action::Delete => {
                let before = records.len();
                records.retain(|r| r.id != request.entity_id);
                if records.len() == before {
                    return Err(not_found(request));
                }
                Ok(RemoteAck::ok())
            }
        }
    }
}

fn not_found(request: &RemoteRequest) -> RemoteFailure {
    RemoteFailure::status(404, format!("{} {} not found", request.kind, request.entity_id))
}

impl RemoteAuthority for MockAuthority {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteAck, RemoteFailure> {
        self.requests.lock().push(request.clone());
        self.before_call().await?;
        debug!(request_type = %request.request_type, id = %request.entity_id, "mock send");
        self.apply(&request)
    }

    async fn fetch_all(&self, request: FetchRequest) -> Result<Vec<RemoteRecord>, RemoteFailure> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;
        Ok(self.records(&request.kind))
    }
}
