//! Mirror records and the on-disk image.

use crate::codec;
use crate::entity::{Action, AuditInfo, Entity, EntityRef, Synchronizable};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Version of the encoded mirror image.
pub const MIRROR_FORMAT_VERSION: u16 = 1;

/// Key of a mirror record: entity type plus id.
///
/// Ids are only unique within one entity type, while the mirror is shared
/// by all of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MirrorKey {
    /// Entity type.
    pub kind: String,
    /// Entity id.
    pub id: String,
}

impl MirrorKey {
    /// Creates a key.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// The key for an id of payload type `P`.
    pub fn of<P: Synchronizable>(id: impl Into<String>) -> Self {
        Self::new(P::KIND, id)
    }
}

impl From<EntityRef> for MirrorKey {
    fn from(reference: EntityRef) -> Self {
        Self::new(reference.kind, reference.id)
    }
}

impl fmt::Display for MirrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// The durable copy of one entity.
///
/// A record with `pending == true` is work accepted locally but not yet
/// confirmed by the remote authority; `action` says what was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Entity type and id.
    pub key: MirrorKey,
    /// The last requested action.
    pub action: Action,
    /// Submitted but not yet resolved.
    pub pending: bool,
    /// Soft-delete flag.
    pub active: bool,
    /// CBOR-encoded payload.
    pub payload: Vec<u8>,
    /// Audit fields.
    pub audit: AuditInfo,
    /// Records this payload points at.
    pub references: Vec<EntityRef>,
}

impl MirrorRecord {
    /// An empty, committed record for `key`.
    pub fn new(key: MirrorKey) -> Self {
        Self {
            key,
            action: Action::Edit,
            pending: false,
            active: true,
            payload: Vec::new(),
            audit: AuditInfo::default(),
            references: Vec::new(),
        }
    }

    /// Rebuilds the entity this record mirrors.
    ///
    /// The returned entity carries the mirrored action and no shadow.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the record belongs to another entity
    /// type or its payload does not decode as `P`.
    pub fn to_entity<P: Synchronizable>(&self) -> CoreResult<Entity<P>> {
        if self.key.kind != P::KIND {
            return Err(CoreError::decode(
                "kind",
                format!("record {} is not a {}", self.key, P::KIND),
            ));
        }
        let payload: P = codec::from_cbor(P::KIND, &self.payload)?;
        Ok(Entity::from_parts(
            self.key.id.clone(),
            self.action,
            self.active,
            self.audit.clone(),
            payload,
        ))
    }

    /// Returns true if this record references `kind`/`id`.
    pub fn references_target(&self, kind: &str, id: &str) -> bool {
        self.references
            .iter()
            .any(|r| r.kind == kind && r.id == id)
    }
}

#[derive(Serialize, Deserialize)]
struct MirrorImage {
    format_version: u16,
    records: Vec<MirrorRecord>,
}

pub(crate) fn encode_image(records: &BTreeMap<MirrorKey, MirrorRecord>) -> CoreResult<Vec<u8>> {
    let image = MirrorImage {
        format_version: MIRROR_FORMAT_VERSION,
        records: records.values().cloned().collect(),
    };
    codec::to_cbor(&image)
}

pub(crate) fn decode_image(bytes: &[u8]) -> CoreResult<BTreeMap<MirrorKey, MirrorRecord>> {
    let image: MirrorImage = codec::from_cbor("mirror image", bytes)?;
    if image.format_version != MIRROR_FORMAT_VERSION {
        return Err(CoreError::decode(
            "mirror image",
            format!(
                "unsupported format version {} (expected {})",
                image.format_version, MIRROR_FORMAT_VERSION
            ),
        ));
    }
    Ok(image
        .records
        .into_iter()
        .map(|record| (record.key.clone(), record))
        .collect())
}
