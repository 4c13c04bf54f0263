//! Folding a freshly fetched collection into the working set and mirror.

use ledgersync_core::{
    Action, CoreResult, DurableMirror, Entity, MirrorKey, Synchronizable, WorkingSet,
};
use ledgersync_storage::StorageBackend;
use std::collections::HashSet;
use tracing::{debug, warn};

/// What one reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Fetched records appended to the working set.
    pub inserted: usize,
    /// Working-set entities overwritten in place.
    pub updated: usize,
    /// Working-set entities tombstoned by absence.
    pub removed: usize,
    /// Local entities kept over the fetched state (pending, unconfirmed,
    /// mid-edit or marked for deletion).
    pub retained: usize,
}

/// Merges an authoritative full-collection fetch.
///
/// The fetch is the full membership list of the collection: anything absent
/// from it is tombstoned, except
/// - records with a pending mirror entry, whose submission has not resolved
/// - entities still in `Add` state, which the remote authority has never seen
///
/// Fetched state never overwrites a pending record, an entity with unsaved
/// edits, or an entity marked for deletion. All mirror effects commit in one transaction before the
/// working set is touched, so a failed run leaves both stores unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionReconciler;

impl CollectionReconciler {
    /// Creates a reconciler.
    pub fn new() -> Self {
        Self
    }

    /// Applies `fetched` to `set` and `mirror`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror transaction fails; nothing is applied
    /// in that case.
    pub fn run<P, B>(
        &self,
        fetched: Vec<Entity<P>>,
        set: &mut WorkingSet<P>,
        mirror: &DurableMirror<B>,
    ) -> CoreResult<ReconcileReport>
    where
        P: Synchronizable,
        B: StorageBackend,
    {
        let active_ids: HashSet<&str> = fetched.iter().map(|e| e.id()).collect();
        let mut pending: HashSet<String> = HashSet::new();
        let mut tombstones: Vec<String> = Vec::new();
        let mut report = ReconcileReport::default();

        mirror.transaction(|txn| {
            for item in &fetched {
                let key = MirrorKey::of::<P>(item.id());
                if txn.get(&key).is_some_and(|r| r.pending) {
                    pending.insert(item.id().to_string());
                    continue;
                }
                txn.write_entity(item, false)?;
            }

            for entity in set.iter() {
                if active_ids.contains(entity.id()) {
                    continue;
                }
                let key = MirrorKey::of::<P>(entity.id());
                if txn.get(&key).is_some_and(|r| r.pending) || entity.action() == Action::Add {
                    debug!(kind = P::KIND, id = entity.id(), "keeping absent record with unresolved work");
                    report.retained += 1;
                    continue;
                }
                txn.delete(&key);
                tombstones.push(entity.id().to_string());
            }

            let stale: Vec<MirrorKey> = txn
                .records()
                .into_iter()
                .filter(|r| r.key.kind == P::KIND && !r.pending)
                .filter(|r| !active_ids.contains(r.key.id.as_str()) && !set.contains(&r.key.id))
                .map(|r| r.key.clone())
                .collect();
            for key in stale {
                txn.delete(&key);
            }
            Ok(())
        })?;

        for item in fetched.iter() {
            if pending.contains(item.id()) {
                report.retained += 1;
                continue;
            }
            match set.get_mut(item.id()) {
                Some(existing)
                    if existing.has_changes() || existing.action() == Action::Delete =>
                {
                    warn!(kind = P::KIND, id = item.id(), "fetched state not applied over unsubmitted local changes");
                    report.retained += 1;
                }
                Some(existing) => {
                    existing.set_from(item);
                    report.updated += 1;
                }
                None => {
                    let mut entity = item.clone();
                    entity.create_shadow();
                    set.insert(entity)?;
                    report.inserted += 1;
                }
            }
        }

        for id in &tombstones {
            set.remove(id);
            report.removed += 1;
        }

        debug!(
            kind = P::KIND,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            retained = report.retained,
            "collection reconciled"
        );
        Ok(report)
    }
}
