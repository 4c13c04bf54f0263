//! The durable local mirror.
//!
//! Every entity that has been mutated or fetched is mirrored here so the
//! application can rebuild its state, and find unconfirmed work, after a
//! restart.

mod record;
mod transaction;

pub use record::{MirrorKey, MirrorRecord, MIRROR_FORMAT_VERSION};
pub use transaction::MirrorTransaction;

use crate::entity::{Entity, Synchronizable};
use crate::error::CoreResult;
use ledgersync_storage::StorageBackend;
use parking_lot::Mutex;
use record::{decode_image, encode_image};
use std::collections::BTreeMap;
use tracing::debug;

/// Crash-safe local store of entity state, shared by all entity types.
///
/// # Atomicity
///
/// All changes go through [`DurableMirror::transaction`]. Transactions are
/// serialized by a lock; a committed transaction is written to the backend
/// as one atomic image replace before it becomes visible. If the closure
/// fails or the write fails, nothing changes.
///
/// # Example
///
/// ```rust
/// use ledgersync_core::{DurableMirror, MirrorKey};
/// use ledgersync_storage::InMemoryBackend;
///
/// let mirror = DurableMirror::open(InMemoryBackend::new()).unwrap();
/// mirror
///     .transaction(|txn| {
///         let record = txn.get_or_create(&MirrorKey::new("keyword", "tmp-1"));
///         record.pending = true;
///         Ok(())
///     })
///     .unwrap();
/// assert!(mirror.is_pending(&MirrorKey::new("keyword", "tmp-1")));
/// ```
pub struct DurableMirror<B: StorageBackend> {
    backend: B,
    records: Mutex<BTreeMap<MirrorKey, MirrorRecord>>,
}

impl<B: StorageBackend> DurableMirror<B> {
    /// Opens a mirror over `backend`, loading its last committed image.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the image does not
    /// decode.
    pub fn open(backend: B) -> CoreResult<Self> {
        let records = match backend.load()? {
            Some(bytes) => decode_image(&bytes)?,
            None => BTreeMap::new(),
        };
        debug!(records = records.len(), "mirror opened");
        Ok(Self {
            backend,
            records: Mutex::new(records),
        })
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs `f` inside an atomic transaction.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a storage error if the commit could
    /// not be made durable. In both cases no change is applied.
    pub fn transaction<F, R>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut MirrorTransaction<'_>) -> CoreResult<R>,
    {
        let mut records = self.records.lock();

        let mut txn = MirrorTransaction::new(&records);
        let output = f(&mut txn)?;
        let (staged, cleared) = txn.into_parts();

        if staged.is_empty() && !cleared {
            return Ok(output);
        }

        let mut next = if cleared {
            BTreeMap::new()
        } else {
            records.clone()
        };
        for (key, record) in staged {
            match record {
                Some(record) => {
                    next.insert(key, record);
                }
                None => {
                    next.remove(&key);
                }
            }
        }

        self.backend.replace(&encode_image(&next)?)?;
        *records = next;
        Ok(output)
    }

    /// Writes an entity's current state with the given pending flag.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the commit fails.
    pub fn upsert<P: Synchronizable>(&self, entity: &Entity<P>, pending: bool) -> CoreResult<()> {
        self.transaction(|txn| txn.write_entity(entity, pending))
    }

    /// Clears the pending flag of a record, moving it to `new_id` if given.
    ///
    /// Returns false if no record exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn clear_pending(&self, key: &MirrorKey, new_id: Option<&str>) -> CoreResult<bool> {
        self.transaction(|txn| Ok(txn.clear_pending(key, new_id)))
    }

    /// Points the stored payloads of every `P` record at `new_id` instead of
    /// `kind`/`old_id`, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the commit fails.
    pub fn remap_payloads<P: Synchronizable>(
        &self,
        kind: &str,
        old_id: &str,
        new_id: &str,
    ) -> CoreResult<usize> {
        self.transaction(|txn| txn.remap_payloads::<P>(kind, old_id, new_id))
    }

    /// Deletes a record in its own transaction. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn delete(&self, key: &MirrorKey) -> CoreResult<bool> {
        self.transaction(|txn| Ok(txn.delete(key)))
    }

    /// Deletes every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn delete_all(&self) -> CoreResult<()> {
        self.transaction(|txn| {
            txn.delete_all();
            Ok(())
        })
    }

    /// Reads a committed record.
    pub fn get(&self, key: &MirrorKey) -> Option<MirrorRecord> {
        self.records.lock().get(key).cloned()
    }

    /// Returns true if a committed record for `key` is pending.
    pub fn is_pending(&self, key: &MirrorKey) -> bool {
        self.records.lock().get(key).is_some_and(|r| r.pending)
    }

    /// Committed records of one entity type.
    pub fn records(&self, kind: &str) -> Vec<MirrorRecord> {
        self.records
            .lock()
            .values()
            .filter(|r| r.key.kind == kind)
            .cloned()
            .collect()
    }

    /// Every committed record.
    pub fn all_records(&self) -> Vec<MirrorRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Pending records, optionally restricted to one entity type.
    ///
    /// This is the recovery set after a restart.
    pub fn pending(&self, kind: Option<&str>) -> Vec<MirrorRecord> {
        self.records
            .lock()
            .values()
            .filter(|r| r.pending && kind.map_or(true, |kind| r.key.kind == kind))
            .cloned()
            .collect()
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if the mirror holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
