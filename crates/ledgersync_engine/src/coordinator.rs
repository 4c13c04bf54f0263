//! The per-entity submit protocol.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::notify::{Notice, Notifier};
use crate::reconciler::{CollectionReconciler, ReconcileReport};
use crate::remote::RemoteAuthority;
use crate::state::{DrainReport, SubmitOutcome, SyncStats};
use chrono::Utc;
use ledgersync_core::{
    parse_date, Action, AuditInfo, CoreError, CoreResult, DurableMirror, Entity, MirrorKey,
    SyncContext, Synchronizable, WorkingSet,
};
use ledgersync_protocol::{FetchRequest, RemoteAck, RemoteFailure, RemoteRequest};
use ledgersync_storage::StorageBackend;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives submissions and refreshes for every entity type.
///
/// # Submit protocol
///
/// 1. An unchanged `Edit` is skipped with no I/O
/// 2. A blank required field reverts an `Edit` or discards an unconfirmed
///    `Add`
/// 3. The mirror record is written with `pending = true`
/// 4. The remote authority is called, bounded by the request timeout
/// 5. Success clears the pending marker (remapping a temporary id);
///    failure leaves it set and notifies the user once
///
/// At most one submission per `(kind, id)` is in flight at a time.
pub struct SyncCoordinator<R, B, N>
where
    R: RemoteAuthority,
    B: StorageBackend,
    N: Notifier,
{
    config: SyncConfig,
    remote: Arc<R>,
    mirror: Arc<DurableMirror<B>>,
    notifier: N,
    reconciler: CollectionReconciler,
    in_flight: Mutex<HashSet<MirrorKey>>,
    refresh_generations: Mutex<HashMap<String, u64>>,
    stats: RwLock<SyncStats>,
}

/// Marks a submission as in flight until dropped.
struct InFlight<'a> {
    keys: &'a Mutex<HashSet<MirrorKey>>,
    key: MirrorKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

impl<R, B, N> SyncCoordinator<R, B, N>
where
    R: RemoteAuthority,
    B: StorageBackend,
    N: Notifier,
{
    /// Creates a new coordinator.
    pub fn new(
        config: SyncConfig,
        remote: Arc<R>,
        mirror: Arc<DurableMirror<B>>,
        notifier: N,
    ) -> Self {
        Self {
            config,
            remote,
            mirror,
            notifier,
            reconciler: CollectionReconciler::new(),
            in_flight: Mutex::new(HashSet::new()),
            refresh_generations: Mutex::new(HashMap::new()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The identity context stamped into requests.
    pub fn context(&self) -> &SyncContext {
        &self.config.context
    }

    /// The remote authority.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// The durable mirror.
    pub fn mirror(&self) -> &Arc<DurableMirror<B>> {
        &self.mirror
    }

    /// The notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while a submission for `key` has not resolved.
    pub fn is_in_flight(&self, key: &MirrorKey) -> bool {
        self.in_flight.lock().contains(key)
    }

    /// Submits the entity with `id` according to its current action.
    ///
    /// This is what a working-set owner calls when an edit session closes
    /// (see [`WorkingSet::select`]).
    ///
    /// `set` is borrowed mutably across the remote call, so one set cannot
    /// submit the same record twice concurrently. The in-flight guard covers
    /// separate sets holding the same `(kind, id)`, such as a fresh set
    /// filled by [`SyncCoordinator::drain_pending`] while an older set is
    /// still submitting.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SubmissionInFlight`] if the same record is already
    ///   being submitted; nothing is done
    /// - a network error ([`SyncError::is_network`]) if the remote call
    ///   failed; the mirror record stays pending and the user was notified
    /// - [`SyncError::Cancelled`] if the remote call was cancelled
    /// - [`SyncError::Core`] if the entity is unknown or the mirror write
    ///   failed; no remote call was made
    pub async fn submit<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
        id: &str,
    ) -> SyncResult<SubmitOutcome> {
        let key = MirrorKey::of::<P>(id);
        let _guard = self.begin(&key)?;
        self.stats.write().submissions += 1;

        let (action, dirty, missing) = {
            let entity = set.get(id).ok_or_else(|| CoreError::not_found(P::KIND, id))?;
            (
                entity.action(),
                entity.has_changes(),
                entity.payload().missing_required_field(),
            )
        };

        if action == Action::Edit && !dirty {
            debug!(kind = P::KIND, id, "no changes since checkpoint; skipping");
            self.stats.write().skipped += 1;
            return Ok(SubmitOutcome::Unchanged);
        }

        if let (Some(field), Action::Add | Action::Edit) = (missing, action) {
            return self.reject_blank(set, &key, action, field);
        }

        self.dispatch(set, &key, action).await
    }

    /// Resubmits every pending mirror record of type `P`.
    ///
    /// Run once on cold start, before trusting a fresh fetch. Each pending
    /// record is placed in `set` (unless an entity with its id is already
    /// there) and submitted with its mirrored action; the unchanged check is
    /// bypassed because the outcome of the earlier attempt is unknown.
    ///
    /// # Errors
    ///
    /// Per-record failures are counted in the report, not returned.
    pub async fn drain_pending<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
    ) -> SyncResult<DrainReport> {
        let mut report = DrainReport::default();

        for record in self.mirror.pending(Some(P::KIND)) {
            let key = record.key.clone();
            let guard = match self.begin(&key) {
                Ok(guard) => guard,
                Err(e) => {
                    debug!(%key, error = %e, "skipping record already in flight");
                    continue;
                }
            };

            if !set.contains(&key.id) {
                match record.to_entity::<P>() {
                    Ok(mut entity) => {
                        entity.create_shadow();
                        set.insert(entity)?;
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "pending record cannot be decoded");
                        report.failed += 1;
                        continue;
                    }
                }
            }

            self.stats.write().submissions += 1;
            match self.dispatch(set, &key, record.action).await {
                Ok(_) => report.submitted += 1,
                Err(e) => {
                    debug!(%key, error = %e, "pending record still unresolved");
                    report.failed += 1;
                }
            }
            drop(guard);
        }

        info!(
            kind = P::KIND,
            submitted = report.submitted,
            failed = report.failed,
            "pending drain finished"
        );
        Ok(report)
    }

    /// Fetches the full collection of `P` and reconciles it into `set` and
    /// the mirror.
    ///
    /// Every fetched record is decoded before anything is applied. If
    /// [`SyncCoordinator::cancel_refresh`] is called, or another refresh of
    /// the same type starts, while the fetch is outstanding, this returns
    /// [`SyncError::Cancelled`] and applies nothing.
    ///
    /// # Errors
    ///
    /// Returns a network error (after notifying the user), a decode error,
    /// or [`SyncError::Cancelled`] (silently).
    pub async fn refresh<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
    ) -> SyncResult<ReconcileReport> {
        let generation = self.next_generation(P::KIND);
        let request = FetchRequest::for_kind::<P>(self.context());

        let fetched = match self.call(self.remote.fetch_all(request)).await {
            Ok(records) => records,
            Err(failure) => {
                let error = SyncError::from(failure);
                if !self.is_current(P::KIND, generation) {
                    debug!(kind = P::KIND, error = %error, "superseded refresh failed; not reported");
                    return Err(SyncError::Cancelled);
                }
                if !error.is_cancelled() {
                    warn!(kind = P::KIND, error = %error, "collection fetch failed");
                    self.stats.write().last_error = Some(error.to_string());
                    self.notifier.notify(Notice::FetchFailed {
                        kind: P::KIND.to_string(),
                    });
                }
                return Err(error);
            }
        };

        if !self.is_current(P::KIND, generation) {
            debug!(kind = P::KIND, "refresh superseded; discarding fetch");
            return Err(SyncError::Cancelled);
        }

        let entities = fetched
            .iter()
            .map(|record| record.to_entity::<P>())
            .collect::<CoreResult<Vec<Entity<P>>>>()?;

        let report = self.reconciler.run(entities, set, &self.mirror)?;
        self.stats.write().refreshes += 1;
        Ok(report)
    }

    /// Points every `Q` that references `kind`/`old_id` at `new_id`, in
    /// `set` and in the mirror.
    ///
    /// Call this for each working set of another entity type after a
    /// [`SubmitOutcome::Created`]. References within the created entity's own
    /// type are remapped by the commit itself. Returns the number of
    /// entities changed in `set`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror commit fails; `set` is unchanged then.
    pub fn propagate_remap<Q: Synchronizable>(
        &self,
        set: &mut WorkingSet<Q>,
        kind: &str,
        old_id: &str,
        new_id: &str,
    ) -> SyncResult<usize> {
        let mirrored = self.mirror.remap_payloads::<Q>(kind, old_id, new_id)?;
        let changed = set.remap_references(kind, old_id, new_id);
        debug!(kind = Q::KIND, referenced = kind, old_id, new_id, mirrored, changed, "references remapped");
        Ok(changed)
    }

    /// Cancels any outstanding refresh of `kind`.
    pub fn cancel_refresh(&self, kind: &str) {
        self.next_generation(kind);
    }

    fn next_generation(&self, kind: &str) -> u64 {
        let mut generations = self.refresh_generations.lock();
        let generation = generations.entry(kind.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, kind: &str, generation: u64) -> bool {
        self.refresh_generations.lock().get(kind) == Some(&generation)
    }

    fn begin(&self, key: &MirrorKey) -> SyncResult<InFlight<'_>> {
        if !self.in_flight.lock().insert(key.clone()) {
            return Err(SyncError::SubmissionInFlight {
                kind: key.kind.clone(),
                id: key.id.clone(),
            });
        }
        Ok(InFlight {
            keys: &self.in_flight,
            key: key.clone(),
        })
    }

    async fn call<T>(
        &self,
        future: impl Future<Output = Result<T, RemoteFailure>>,
    ) -> Result<T, RemoteFailure> {
        match tokio::time::timeout(self.config.request_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(RemoteFailure::Timeout),
        }
    }

    fn reject_blank<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
        key: &MirrorKey,
        action: Action,
        field: &str,
    ) -> SyncResult<SubmitOutcome> {
        if action == Action::Add {
            self.mirror.delete(key)?;
            set.remove(&key.id);
            debug!(%key, field, "discarding blank unconfirmed record");
            self.stats.write().discarded += 1;
            return Ok(SubmitOutcome::Discarded);
        }

        set.require_mut(&key.id)?.restore();
        self.stats.write().reverted += 1;
        self.notifier.notify(Notice::Validation {
            kind: key.kind.clone(),
            id: key.id.clone(),
            message: format!("{field} cannot be empty"),
        });
        Ok(SubmitOutcome::Reverted)
    }

    async fn dispatch<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
        key: &MirrorKey,
        action: Action,
    ) -> SyncResult<SubmitOutcome> {
        let entity = set.require_mut(&key.id)?;
        entity.set_action(action);

        if action == Action::Delete && !entity.is_confirmed() {
            self.mirror.delete(key)?;
            set.remove(&key.id);
            info!(%key, "unconfirmed record deleted locally");
            self.stats.write().deleted += 1;
            return Ok(SubmitOutcome::Deleted {
                id: key.id.clone(),
            });
        }

        if action == Action::Edit {
            entity.audit_mut().touch(self.context(), Utc::now());
        }
        self.mirror.upsert(entity, true)?;
        let request = RemoteRequest::for_entity(entity, action, self.context())?;

        debug!(%key, request_type = %request.request_type, "submitting");
        match self.call(self.remote.send(request)).await {
            Ok(ack) => self.commit(set, key, action, &ack),
            Err(failure) => self.fail(set, key, failure),
        }
    }

    fn commit<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
        key: &MirrorKey,
        action: Action,
        ack: &RemoteAck,
    ) -> SyncResult<SubmitOutcome> {
        let id = key.id.clone();

        if action == Action::Delete {
            self.mirror.delete(key)?;
            set.remove(&id);
            info!(%key, "deletion confirmed");
            self.stats.write().deleted += 1;
            return Ok(SubmitOutcome::Deleted { id });
        }

        let mut audit = set.require_mut(&id)?.audit().clone();
        self.stamp(&mut audit, ack);

        if action == Action::Add {
            let Some(server_id) = ack.assigned_id.clone().filter(|s| !s.is_empty()) else {
                let failure = RemoteFailure::Rejected("creation acknowledged without an id".into());
                return self.fail(set, key, failure);
            };
            let new_key = MirrorKey::new(key.kind.clone(), server_id.clone());

            self.mirror.transaction(|txn| {
                if txn.clear_pending(key, Some(server_id.as_str())) {
                    txn.get_or_create(&new_key).audit = audit.clone();
                }
                txn.remap_payloads::<P>(&key.kind, &id, &server_id)?;
                Ok(())
            })?;
            set.remap_id(&id, &server_id)?;
            settle(set.require_mut(&server_id)?, audit);

            info!(kind = %key.kind, temp_id = %id, server_id = %server_id, "creation confirmed");
            self.stats.write().created += 1;
            return Ok(SubmitOutcome::Created {
                temp_id: id,
                server_id,
            });
        }

        self.mirror.transaction(|txn| {
            if txn.clear_pending(key, None) {
                txn.get_or_create(key).audit = audit.clone();
            }
            Ok(())
        })?;
        settle(set.require_mut(&id)?, audit);

        debug!(%key, "edit confirmed");
        self.stats.write().updated += 1;
        Ok(SubmitOutcome::Updated { id })
    }

    fn fail<P: Synchronizable>(
        &self,
        set: &mut WorkingSet<P>,
        key: &MirrorKey,
        failure: RemoteFailure,
    ) -> SyncResult<SubmitOutcome> {
        if let Some(entity) = set.get_mut(&key.id) {
            let next = if entity.is_confirmed() {
                Action::Edit
            } else {
                Action::Add
            };
            entity.set_action(next);
        }

        let error = SyncError::from(failure);
        if error.is_cancelled() {
            debug!(%key, "submission cancelled");
            return Err(error);
        }

        warn!(%key, error = %error, "submission failed; pending marker kept");
        {
            let mut stats = self.stats.write();
            stats.failed += 1;
            stats.last_error = Some(error.to_string());
        }
        self.notifier.notify(Notice::WillRetryLater {
            kind: key.kind.clone(),
            id: key.id.clone(),
        });
        Err(error)
    }

    fn stamp(&self, audit: &mut AuditInfo, ack: &RemoteAck) {
        let when = match ack.updated_date.as_deref().map(|d| parse_date("updated_date", d)) {
            Some(Ok(date)) => date,
            Some(Err(e)) => {
                warn!(error = %e, "ignoring unparsable update stamp in ack");
                Utc::now()
            }
            None => Utc::now(),
        };
        audit.touch(self.context(), when);
        if let Some(by) = &ack.updated_by {
            audit.updated_by.clone_from(by);
        }
    }
}

/// Marks an entity as committed with the given audit fields.
fn settle<P: Synchronizable>(entity: &mut Entity<P>, audit: AuditInfo) {
    entity.set_action(Action::Edit);
    *entity.audit_mut() = audit;
    entity.create_shadow();
}
