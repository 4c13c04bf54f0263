//! Shadow snapshots: the committed baseline of an entity.

/// A value copy of an entity's payload and active flag taken at a
/// checkpoint (opening an edit session, or right after a successful sync).
///
/// Snapshots are plain values. Nothing points back at the entity, and
/// comparing against one is a pure structural equality check.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSnapshot<P> {
    payload: P,
    active: bool,
}

impl<P: Clone + PartialEq> ShadowSnapshot<P> {
    /// Copies the given fields into a new snapshot.
    pub fn capture(payload: &P, active: bool) -> Self {
        Self {
            payload: payload.clone(),
            active,
        }
    }

    /// Whether the given live fields equal the snapshot.
    pub fn matches(&self, payload: &P, active: bool) -> bool {
        self.active == active && self.payload == *payload
    }

    /// The checkpointed payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// The checkpointed active flag.
    pub fn active(&self) -> bool {
        self.active
    }
}
