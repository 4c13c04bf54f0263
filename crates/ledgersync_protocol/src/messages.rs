//! Messages exchanged with the remote authority.

use crate::codec::WireMessage;
use ledgersync_core::{codec, Action, AuditInfo, CoreResult, Entity, SyncContext, Synchronizable};
use serde::{Deserialize, Serialize};

/// The envelope submitted for one entity mutation.
///
/// `request_type` is the action-specific string the remote authority routes
/// on (for example `add_keyword`); the rest identifies the record, the
/// account and the device, and carries the CBOR payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Action-specific request type.
    pub request_type: String,
    /// Requested action.
    pub action: Action,
    /// Entity type.
    pub kind: String,
    /// Current id of the entity (temporary for an `Add`).
    pub entity_id: String,
    /// Account the entity belongs to.
    pub account_id: String,
    /// Submitting device.
    pub device_id: String,
    /// Submitting user.
    pub user: String,
    /// Soft-delete flag.
    pub active: bool,
    /// CBOR-encoded payload.
    pub payload: Vec<u8>,
    /// Creation time (RFC 3339).
    pub entered_date: String,
    /// Last change time (RFC 3339).
    pub updated_date: String,
}

impl RemoteRequest {
    /// Builds the envelope for submitting `entity` with `action`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn for_entity<P: Synchronizable>(
        entity: &Entity<P>,
        action: Action,
        context: &SyncContext,
    ) -> CoreResult<Self> {
        Ok(Self {
            request_type: P::request_type(action),
            action,
            kind: P::KIND.to_string(),
            entity_id: entity.id().to_string(),
            account_id: context.account_id.clone(),
            device_id: context.device_id.clone(),
            user: context.user.clone(),
            active: entity.is_active(),
            payload: codec::to_cbor(entity.payload())?,
            entered_date: AuditInfo::format_date(&entity.audit().entered_date),
            updated_date: AuditInfo::format_date(&entity.audit().updated_date),
        })
    }
}

impl WireMessage for RemoteRequest {
    const NAME: &'static str = "remote request";
}

/// Success body of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAck {
    /// Server-issued id, present for creations.
    pub assigned_id: Option<String>,
    /// Who the remote authority recorded as the last editor.
    pub updated_by: Option<String>,
    /// When the remote authority recorded the change (RFC 3339).
    pub updated_date: Option<String>,
}

impl RemoteAck {
    /// A bare acknowledgement.
    pub fn ok() -> Self {
        Self::default()
    }

    /// An acknowledgement of a creation.
    pub fn created(id: impl Into<String>) -> Self {
        Self {
            assigned_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Attaches the server's audit stamp.
    #[must_use]
    pub fn with_update_stamp(
        mut self,
        updated_by: impl Into<String>,
        updated_date: impl Into<String>,
    ) -> Self {
        self.updated_by = Some(updated_by.into());
        self.updated_date = Some(updated_date.into());
        self
    }
}

impl WireMessage for RemoteAck {
    const NAME: &'static str = "remote ack";
}

/// Request for the full membership of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Request type (`fetch_<kind>`).
    pub request_type: String,
    /// Entity type.
    pub kind: String,
    /// Account whose collection is fetched.
    pub account_id: String,
    /// Requesting device.
    pub device_id: String,
}

impl FetchRequest {
    /// The fetch of every `P` on the context's account.
    pub fn for_kind<P: Synchronizable>(context: &SyncContext) -> Self {
        Self {
            request_type: format!("fetch_{}", P::KIND),
            kind: P::KIND.to_string(),
            account_id: context.account_id.clone(),
            device_id: context.device_id.clone(),
        }
    }
}

impl WireMessage for FetchRequest {
    const NAME: &'static str = "fetch request";
}

/// One record of a fetched collection, as the remote authority sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Server id.
    pub id: String,
    /// Soft-delete flag.
    pub active: bool,
    /// CBOR-encoded payload.
    pub payload: Vec<u8>,
    /// User that created the record.
    pub entered_by: String,
    /// User that last changed the record.
    pub updated_by: String,
    /// Creation time (RFC 3339).
    pub entered_date: String,
    /// Last change time (RFC 3339).
    pub updated_date: String,
}

impl RemoteRecord {
    /// Encodes a confirmed entity the way the remote authority would send it.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn from_entity<P: Synchronizable>(entity: &Entity<P>) -> CoreResult<Self> {
        let audit = entity.audit();
        Ok(Self {
            id: entity.id().to_string(),
            active: entity.is_active(),
            payload: codec::to_cbor(entity.payload())?,
            entered_by: audit.entered_by.clone(),
            updated_by: audit.updated_by.clone(),
            entered_date: AuditInfo::format_date(&audit.entered_date),
            updated_date: AuditInfo::format_date(&audit.updated_date),
        })
    }

    /// Decodes into a committed entity (`Edit`, no shadow).
    ///
    /// # Errors
    ///
    /// Returns [`ledgersync_core::CoreError::Decode`] naming the field when
    /// the payload or an audit date is malformed.
    pub fn to_entity<P: Synchronizable>(&self) -> CoreResult<Entity<P>> {
        let payload: P = codec::from_cbor(P::KIND, &self.payload)?;
        let audit = AuditInfo::from_wire(
            self.entered_by.clone(),
            self.updated_by.clone(),
            &self.entered_date,
            &self.updated_date,
        )?;
        Ok(Entity::new(self.id.clone(), payload, audit).with_active(self.active))
    }
}

/// A fetched collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Every record currently in the collection.
    pub records: Vec<RemoteRecord>,
}

impl FetchResponse {
    /// Wraps fetched records.
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self { records }
    }
}

impl WireMessage for FetchResponse {
    const NAME: &'static str = "fetch response";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use ledgersync_core::CoreError;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Keyword {
        title: String,
    }

    impl Synchronizable for Keyword {
        const KIND: &'static str = "keyword";
    }

    fn context() -> SyncContext {
        SyncContext::new("acct-1", "dana", "device-a")
    }

    #[test]
    fn request_is_tagged_with_action_key() {
        let entity = Entity::new_local_with_id(
            "tmp-1",
            Keyword {
                title: "Groceries".into(),
            },
            &context(),
        );

        let add = RemoteRequest::for_entity(&entity, Action::Add, &context()).unwrap();
        assert_eq!(add.request_type, "add_keyword");
        assert_eq!(add.entity_id, "tmp-1");
        assert_eq!(add.account_id, "acct-1");
        assert_eq!(add.device_id, "device-a");

        let delete = RemoteRequest::for_entity(&entity, Action::Delete, &context()).unwrap();
        assert_eq!(delete.request_type, "delete_keyword");
    }

    #[test]
    fn request_survives_the_wire() {
        let entity = Entity::new_local_with_id(
            "tmp-1",
            Keyword {
                title: "Groceries".into(),
            },
            &context(),
        );
        let request = RemoteRequest::for_entity(&entity, Action::Add, &context()).unwrap();
        let decoded = RemoteRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded, request);

        let payload: Keyword = codec::from_cbor("payload", &decoded.payload).unwrap();
        assert_eq!(payload.title, "Groceries");
    }

    #[test]
    fn fetch_request_names_collection() {
        let request = FetchRequest::for_kind::<Keyword>(&context());
        assert_eq!(request.request_type, "fetch_keyword");
        assert_eq!(request.kind, "keyword");
    }

    #[test]
    fn remote_record_decodes_to_committed_entity() {
        let record = RemoteRecord {
            id: "42".into(),
            active: false,
            payload: codec::to_cbor(&Keyword {
                title: "Fuel".into(),
            })
            .unwrap(),
            entered_by: "dana".into(),
            updated_by: "sam".into(),
            entered_date: "2026-03-01T09:30:00.000Z".into(),
            updated_date: "2026-03-02T09:30:00.000Z".into(),
        };

        let entity: Entity<Keyword> = record.to_entity().unwrap();
        assert_eq!(entity.id(), "42");
        assert_eq!(entity.action(), Action::Edit);
        assert!(!entity.is_active());
        assert_eq!(entity.audit().updated_by, "sam");
        assert_eq!(RemoteRecord::from_entity(&entity).unwrap(), record);
    }

    #[test]
    fn malformed_date_is_a_typed_error() {
        let record = RemoteRecord {
            id: "42".into(),
            active: true,
            payload: codec::to_cbor(&Keyword {
                title: "Fuel".into(),
            })
            .unwrap(),
            entered_by: "dana".into(),
            updated_by: "dana".into(),
            entered_date: "2026-03-01T09:30:00.000Z".into(),
            updated_date: "not a date".into(),
        };

        match record.to_entity::<Keyword>() {
            Err(CoreError::Decode { field, .. }) => assert_eq!(field, "updated_date"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn truncated_ack_is_a_decode_error() {
        let bytes = RemoteAck::created("42").encode().unwrap();
        let result = RemoteAck::decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(
            result,
            Err(ProtocolError::Decode {
                message: "remote ack",
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = FetchResponse::decode(&bytes);
            let _ = RemoteAck::decode(&bytes);
        }
    }
}
