//! Entities and the contract their payloads implement.

mod audit;
mod id;

pub use audit::{parse_date, AuditInfo};
pub use id::{is_temporary_id, temporary_id, TEMP_ID_PREFIX};

use crate::codec;
use crate::context::SyncContext;
use crate::error::CoreResult;
use crate::shadow::ShadowSnapshot;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the next submission of an entity must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Created locally, not yet confirmed by the remote authority.
    Add,
    /// Known to the remote authority; submissions send a diff.
    Edit,
    /// Submit a deletion, then discard.
    Delete,
}

impl Action {
    /// The action-specific key used to tag outgoing requests.
    pub fn server_key(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    /// Parses a server key.
    pub fn from_server_key(key: &str) -> Option<Self> {
        match key {
            "add" => Some(Action::Add),
            "edit" => Some(Action::Edit),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.server_key())
    }
}

/// A typed pointer at another record: entity type plus id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type of the target.
    pub kind: String,
    /// Id of the target.
    pub id: String,
}

impl EntityRef {
    /// Creates a new reference.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// A foreign key held by a payload, optionally with an embedded copy of the
/// target so it can be reconstructed on cold start.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyStub {
    /// The referenced record.
    pub target: EntityRef,
    /// CBOR payload of the target, when the payload embeds it.
    pub payload: Option<Vec<u8>>,
}

impl ForeignKeyStub {
    /// A bare reference with no embedded copy.
    pub fn reference(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            target: EntityRef::new(kind, id),
            payload: None,
        }
    }

    /// A reference carrying an embedded copy of the target.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be encoded.
    pub fn embed<T: Serialize>(
        kind: impl Into<String>,
        id: impl Into<String>,
        value: &T,
    ) -> CoreResult<Self> {
        Ok(Self {
            target: EntityRef::new(kind, id),
            payload: Some(codec::to_cbor(value)?),
        })
    }
}

/// The contract every synchronizable payload implements.
///
/// A payload only supplies field-level equality (`PartialEq`), its entity
/// type name and, optionally, validation and foreign-key handling. Identity,
/// action tracking, snapshots and persistence are provided generically by
/// [`Entity`] and the mirror.
///
/// # Example
///
/// ```rust
/// use ledgersync_core::Synchronizable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Tag {
///     title: String,
/// }
///
/// impl Synchronizable for Tag {
///     const KIND: &'static str = "tag";
///
///     fn missing_required_field(&self) -> Option<&'static str> {
///         self.title.trim().is_empty().then_some("title")
///     }
/// }
/// ```
pub trait Synchronizable:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Entity type name, used to key mirror records and tag requests.
    const KIND: &'static str;

    /// The request type sent to the remote authority for `action`.
    fn request_type(action: Action) -> String {
        format!("{}_{}", action.server_key(), Self::KIND)
    }

    /// Names a required field the user left blank, if any.
    fn missing_required_field(&self) -> Option<&'static str> {
        None
    }

    /// Foreign keys held by this payload.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded target cannot be encoded.
    fn foreign_keys(&self) -> CoreResult<Vec<ForeignKeyStub>> {
        Ok(Vec::new())
    }

    /// Rewrites references to `kind`/`old_id` so they point at `new_id`.
    ///
    /// Returns true if anything changed.
    fn remap_reference(&mut self, _kind: &str, _old_id: &str, _new_id: &str) -> bool {
        false
    }
}

/// A mutable, identity-bearing record subject to optimistic local editing.
///
/// The shadow snapshot is owned by the entity and never shared. Cloning an
/// entity clones its snapshot by value.
#[derive(Debug, Clone)]
pub struct Entity<P: Synchronizable> {
    id: String,
    action: Action,
    active: bool,
    audit: AuditInfo,
    payload: P,
    shadow: Option<ShadowSnapshot<P>>,
}

impl<P: Synchronizable> Entity<P> {
    /// An entity already known to the remote authority.
    pub fn new(id: impl Into<String>, payload: P, audit: AuditInfo) -> Self {
        Self {
            id: id.into(),
            action: Action::Edit,
            active: true,
            audit,
            payload,
            shadow: None,
        }
    }

    /// A brand-new local entity with a fresh temporary id.
    ///
    /// The entity starts in [`Action::Add`], with audit fields stamped from
    /// `context` and its shadow checkpointed.
    pub fn new_local(payload: P, context: &SyncContext) -> Self {
        Self::new_local_with_id(temporary_id(), payload, context)
    }

    /// Like [`Entity::new_local`] but with a caller-chosen temporary id.
    pub fn new_local_with_id(id: impl Into<String>, payload: P, context: &SyncContext) -> Self {
        let mut entity = Self {
            id: id.into(),
            action: Action::Add,
            active: true,
            audit: AuditInfo::created(context, Utc::now()),
            payload,
            shadow: None,
        };
        entity.create_shadow();
        entity
    }

    pub(crate) fn from_parts(
        id: String,
        action: Action,
        active: bool,
        audit: AuditInfo,
        payload: P,
    ) -> Self {
        Self {
            id,
            action,
            active,
            audit,
            payload,
            shadow: None,
        }
    }

    /// Sets the soft-delete flag at construction.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The current id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// The pending action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Sets the pending action.
    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    /// Whether the record is active (not soft-deleted).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Sets the soft-delete flag.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Audit fields.
    pub fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    /// Mutable audit fields.
    pub fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }

    /// The payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Mutable payload, for user edits.
    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// True once the remote authority has issued this entity's id.
    pub fn is_confirmed(&self) -> bool {
        !is_temporary_id(&self.id)
    }

    /// Checkpoints the current payload and active flag as the baseline.
    ///
    /// Replaces any earlier snapshot.
    pub fn create_shadow(&mut self) {
        self.shadow = Some(ShadowSnapshot::capture(&self.payload, self.active));
    }

    /// The current snapshot, if one was taken.
    pub fn shadow(&self) -> Option<&ShadowSnapshot<P>> {
        self.shadow.as_ref()
    }

    /// Whether live fields differ from the snapshot.
    ///
    /// Returns `false` when no snapshot exists. Pure: no I/O, no mutation.
    pub fn has_changes(&self) -> bool {
        self.shadow
            .as_ref()
            .is_some_and(|shadow| !shadow.matches(&self.payload, self.active))
    }

    /// Overwrites live fields with the snapshot's values.
    ///
    /// The snapshot is kept, so afterwards `has_changes()` is false. Returns
    /// false (and changes nothing) when no snapshot exists.
    pub fn restore(&mut self) -> bool {
        match &self.shadow {
            Some(shadow) => {
                self.payload = shadow.payload().clone();
                self.active = shadow.active();
                true
            }
            None => false,
        }
    }

    /// Drops the snapshot without touching live fields.
    pub fn discard_shadow(&mut self) {
        self.shadow = None;
    }

    /// Overwrites payload, active flag and audit fields from another instance
    /// of the same record, keeping this object's identity.
    ///
    /// The result is committed state: the action becomes `Edit` and the
    /// shadow is re-checkpointed.
    pub fn set_from(&mut self, other: &Entity<P>) {
        self.payload = other.payload.clone();
        self.active = other.active;
        self.audit = other.audit.clone();
        self.action = Action::Edit;
        self.create_shadow();
    }
}
