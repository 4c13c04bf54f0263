//! Staged changes against the mirror.

use super::record::{MirrorKey, MirrorRecord};
use crate::codec;
use crate::entity::{Action, Entity, Synchronizable};
use crate::error::CoreResult;
use std::collections::BTreeMap;
use tracing::warn;

/// An open mirror transaction.
///
/// Reads see the committed records overlaid with this transaction's own
/// staged writes. Nothing is visible to other transactions, or durable,
/// until the closure passed to [`super::DurableMirror::transaction`] returns
/// `Ok`.
pub struct MirrorTransaction<'a> {
    base: &'a BTreeMap<MirrorKey, MirrorRecord>,
    staged: BTreeMap<MirrorKey, Option<MirrorRecord>>,
    cleared: bool,
}

impl<'a> MirrorTransaction<'a> {
    pub(crate) fn new(base: &'a BTreeMap<MirrorKey, MirrorRecord>) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
            cleared: false,
        }
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<MirrorKey, Option<MirrorRecord>>, bool) {
        (self.staged, self.cleared)
    }

    /// Reads a record.
    pub fn get(&self, key: &MirrorKey) -> Option<&MirrorRecord> {
        match self.staged.get(key) {
            Some(staged) => staged.as_ref(),
            None if self.cleared => None,
            None => self.base.get(key),
        }
    }

    /// Returns the record for `key`, creating an empty committed record if
    /// none exists.
    pub fn get_or_create(&mut self, key: &MirrorKey) -> &mut MirrorRecord {
        let base = self.base;
        let cleared = self.cleared;
        let slot = self
            .staged
            .entry(key.clone())
            .or_insert_with(|| if cleared { None } else { base.get(key).cloned() });
        slot.get_or_insert_with(|| MirrorRecord::new(key.clone()))
    }

    /// Writes a whole record.
    pub fn put(&mut self, record: MirrorRecord) {
        self.staged.insert(record.key.clone(), Some(record));
    }

    /// Deletes a record. Returns true if it existed.
    pub fn delete(&mut self, key: &MirrorKey) -> bool {
        if self.get(key).is_none() {
            return false;
        }
        self.staged.insert(key.clone(), None);
        true
    }

    /// Deletes every record.
    pub fn delete_all(&mut self) {
        self.staged.clear();
        self.cleared = true;
    }

    /// All visible records, ordered by key.
    pub fn records(&self) -> Vec<&MirrorRecord> {
        let mut merged: BTreeMap<&MirrorKey, &MirrorRecord> = BTreeMap::new();
        if !self.cleared {
            merged.extend(self.base.iter());
        }
        for (key, staged) in &self.staged {
            match staged {
                Some(record) => {
                    merged.insert(key, record);
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_values().collect()
    }

    /// Rewrites every reference to `kind`/`old_id` into `new_id`.
    ///
    /// Returns the number of records changed.
    pub fn remap_references(&mut self, kind: &str, old_id: &str, new_id: &str) -> usize {
        let affected: Vec<MirrorRecord> = self
            .records()
            .into_iter()
            .filter(|record| record.references_target(kind, old_id))
            .cloned()
            .collect();

        let count = affected.len();
        for mut record in affected {
            for reference in &mut record.references {
                if reference.kind == kind && reference.id == old_id {
                    reference.id = new_id.to_string();
                }
            }
            self.put(record);
        }
        count
    }

    /// Rewrites references to `kind`/`old_id` inside the stored payloads of
    /// every `P` record.
    ///
    /// [`Self::remap_references`] only touches the reference lists, since
    /// payloads are opaque until decoded as `P`. Pending flags and actions
    /// are kept. A payload that cannot be decoded is skipped. Returns the
    /// number of records changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a remapped payload cannot be encoded.
    pub fn remap_payloads<P: Synchronizable>(
        &mut self,
        kind: &str,
        old_id: &str,
        new_id: &str,
    ) -> CoreResult<usize> {
        let candidates: Vec<MirrorRecord> = self
            .records()
            .into_iter()
            .filter(|record| record.key.kind == P::KIND && !record.payload.is_empty())
            .cloned()
            .collect();

        let mut changed = 0;
        for mut record in candidates {
            let mut payload: P = match codec::from_cbor(P::KIND, &record.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(key = %record.key, error = %e, "skipping undecodable payload during remap");
                    continue;
                }
            };
            if !payload.remap_reference(kind, old_id, new_id) {
                continue;
            }
            record.payload = codec::to_cbor(&payload)?;
            record.references = payload
                .foreign_keys()?
                .into_iter()
                .map(|stub| stub.target)
                .collect();
            self.put(record);
            changed += 1;
        }
        Ok(changed)
    }

    /// Mirrors an entity's current state, including its foreign-key stubs.
    ///
    /// Embedded sub-records are written with get-or-create-then-overwrite,
    /// except when the sub-record has pending work of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload or a stub cannot be encoded.
    pub fn write_entity<P: Synchronizable>(
        &mut self,
        entity: &Entity<P>,
        pending: bool,
    ) -> CoreResult<()> {
        let payload = codec::to_cbor(entity.payload())?;
        let stubs = entity.payload().foreign_keys()?;

        let record = self.get_or_create(&MirrorKey::of::<P>(entity.id()));
        record.action = entity.action();
        record.pending = pending;
        record.active = entity.is_active();
        record.payload = payload;
        record.audit = entity.audit().clone();
        record.references = stubs.iter().map(|stub| stub.target.clone()).collect();

        for stub in stubs {
            if let Some(payload) = stub.payload {
                let sub = self.get_or_create(&MirrorKey::from(stub.target));
                if !sub.pending {
                    sub.payload = payload;
                }
            }
        }
        Ok(())
    }

    /// Marks a record as confirmed, optionally moving it to a server-issued
    /// id.
    ///
    /// The move deletes the old key, rewrites references to it and writes
    /// the new key within this transaction, so no committed state ever holds
    /// both. Returns false if there was no record.
    pub fn clear_pending(&mut self, key: &MirrorKey, new_id: Option<&str>) -> bool {
        let Some(mut record) = self.get(key).cloned() else {
            return false;
        };
        record.pending = false;
        record.action = Action::Edit;

        if let Some(new_id) = new_id.filter(|new_id| *new_id != key.id) {
            self.delete(key);
            self.remap_references(&key.kind, &key.id, new_id);
            record.key = MirrorKey::new(key.kind.clone(), new_id);
        }

        self.put(record);
        true
    }
}
