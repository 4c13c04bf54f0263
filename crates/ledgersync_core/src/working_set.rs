//! The per-type in-memory collection a UI binds to.

use crate::context::SyncContext;
use crate::entity::{Action, Entity, Synchronizable};
use crate::error::{CoreError, CoreResult};
use tracing::debug;

/// An ordered collection of entities of one type.
///
/// # Invariants
///
/// - No two entities share an id
/// - Entities are never replaced wholesale once inserted; updates go through
///   [`Entity::set_from`] so anything holding the position stays valid
///
/// The working set also tracks the edit-session selection. The transition
/// away from a selected id is the single point where a submission is due.
#[derive(Debug, Clone)]
pub struct WorkingSet<P: Synchronizable> {
    entities: Vec<Entity<P>>,
    selection: Option<String>,
}

impl<P: Synchronizable> Default for WorkingSet<P> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            selection: None,
        }
    }
}

impl<P: Synchronizable> WorkingSet<P> {
    /// Creates an empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity type held by this set.
    pub fn kind(&self) -> &'static str {
        P::KIND
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity<P>> {
        self.entities.iter()
    }

    /// Iterates active (not soft-deleted) entities in order.
    pub fn active(&self) -> impl Iterator<Item = &Entity<P>> {
        self.entities.iter().filter(|entity| entity.is_active())
    }

    /// All ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.id().to_string()).collect()
    }

    /// Returns true if an entity with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.id() == id)
    }

    /// Looks up an entity.
    pub fn get(&self, id: &str) -> Option<&Entity<P>> {
        self.entities.iter().find(|e| e.id() == id)
    }

    /// Looks up an entity for editing.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity<P>> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    /// Looks up an entity or fails with [`CoreError::EntityNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no entity has this id.
    pub fn require_mut(&mut self, id: &str) -> CoreResult<&mut Entity<P>> {
        self.get_mut(id).ok_or_else(|| CoreError::not_found(P::KIND, id))
    }

    /// Appends an entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateId`] if the id is already present.
    pub fn insert(&mut self, entity: Entity<P>) -> CoreResult<()> {
        if self.contains(entity.id()) {
            return Err(CoreError::DuplicateId {
                kind: P::KIND.to_string(),
                id: entity.id().to_string(),
            });
        }
        self.entities.push(entity);
        Ok(())
    }

    /// Creates a new local entity (temporary id, `Add`) and appends it.
    ///
    /// Returns the temporary id.
    pub fn create_local(&mut self, payload: P, context: &SyncContext) -> String {
        let entity = Entity::new_local(payload, context);
        let id = entity.id().to_string();
        self.entities.push(entity);
        id
    }

    /// Removes an entity, returning it.
    pub fn remove(&mut self, id: &str) -> Option<Entity<P>> {
        let index = self.position(id)?;
        if self.selection.as_deref() == Some(id) {
            self.selection = None;
        }
        Some(self.entities.remove(index))
    }

    /// Marks an entity for deletion on its next submission.
    ///
    /// # Errors
    ///
    /// Returns an error if no entity has this id.
    pub fn mark_deleted(&mut self, id: &str) -> CoreResult<()> {
        self.require_mut(id)?.set_action(Action::Delete);
        Ok(())
    }

    /// Replaces an entity's id, typically a temporary id with a server id.
    ///
    /// If another entity already holds `new_id` (a fetch got there first),
    /// that stale copy is dropped so the ids stay unique. References inside
    /// this set's payloads are rewritten too.
    ///
    /// # Errors
    ///
    /// Returns an error if no entity has `old_id`.
    pub fn remap_id(&mut self, old_id: &str, new_id: &str) -> CoreResult<()> {
        if old_id == new_id {
            return Ok(());
        }
        if !self.contains(old_id) {
            return Err(CoreError::not_found(P::KIND, old_id));
        }
        if let Some(stale) = self.position(new_id) {
            debug!(kind = P::KIND, id = new_id, "dropping stale copy during id remap");
            self.entities.remove(stale);
        }

        self.require_mut(old_id)?.set_id(new_id.to_string());
        if self.selection.as_deref() == Some(old_id) {
            self.selection = Some(new_id.to_string());
        }
        self.remap_references(P::KIND, old_id, new_id);
        Ok(())
    }

    /// Rewrites foreign keys to `kind`/`old_id` in every payload.
    ///
    /// Snapshots are rewritten alongside so the remap is not seen as a user
    /// edit. Returns the number of entities changed.
    pub fn remap_references(&mut self, kind: &str, old_id: &str, new_id: &str) -> usize {
        let mut changed = 0;
        for entity in &mut self.entities {
            let dirty = entity.has_changes();
            if entity.payload_mut().remap_reference(kind, old_id, new_id) {
                changed += 1;
                if !dirty {
                    entity.create_shadow();
                }
            }
        }
        changed
    }

    /// The id currently open in an edit session.
    pub fn selected(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Moves the edit-session selection.
    ///
    /// Selecting an id checkpoints that entity's shadow so later comparison
    /// only reflects the user's edits. When the selection moves away from an
    /// id that still exists, that id is returned: it is due for submission.
    pub fn select(&mut self, id: Option<&str>) -> Option<String> {
        if self.selection.as_deref() == id {
            return None;
        }

        let previous = self.selection.take();
        if let Some(id) = id {
            if let Some(entity) = self.get_mut(id) {
                entity.create_shadow();
                self.selection = Some(id.to_string());
            }
        }

        previous.filter(|prev| self.contains(prev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AuditInfo, ForeignKeyStub};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Budget {
        title: String,
        group_id: Option<String>,
    }

    impl Synchronizable for Budget {
        const KIND: &'static str = "budget";

        fn foreign_keys(&self) -> CoreResult<Vec<ForeignKeyStub>> {
            Ok(self
                .group_id
                .iter()
                .map(|id| ForeignKeyStub::reference("budget", id.clone()))
                .collect())
        }

        fn remap_reference(&mut self, kind: &str, old_id: &str, new_id: &str) -> bool {
            if kind == "budget" && self.group_id.as_deref() == Some(old_id) {
                self.group_id = Some(new_id.to_string());
                return true;
            }
            false
        }
    }

    fn budget(title: &str) -> Budget {
        Budget {
            title: title.into(),
            group_id: None,
        }
    }

    fn known(id: &str, title: &str) -> Entity<Budget> {
        Entity::new(id, budget(title), AuditInfo::default())
    }

    fn context() -> SyncContext {
        SyncContext::new("acct-1", "dana", "device-a")
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut set = WorkingSet::new();
        set.insert(known("1", "Rent")).unwrap();
        let err = set.insert(known("1", "Other")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn create_local_appends_add_entity() {
        let mut set = WorkingSet::new();
        let id = set.create_local(budget("Fuel"), &context());
        let entity = set.get(&id).unwrap();
        assert_eq!(entity.action(), Action::Add);
        assert!(!entity.is_confirmed());
    }

    #[test]
    fn remap_id_moves_identity_and_references() {
        let mut set = WorkingSet::new();
        set.insert(Entity::new_local_with_id("tmp-1", budget("Home"), &context()))
            .unwrap();
        let mut child = known("5", "Utilities");
        child.payload_mut().group_id = Some("tmp-1".into());
        child.create_shadow();
        set.insert(child).unwrap();

        set.remap_id("tmp-1", "42").unwrap();

        assert!(set.contains("42"));
        assert!(!set.contains("tmp-1"));
        let child = set.get("5").unwrap();
        assert_eq!(child.payload().group_id.as_deref(), Some("42"));
        assert!(!child.has_changes());
    }

    #[test]
    fn remap_id_drops_stale_copy() {
        let mut set = WorkingSet::new();
        set.insert(Entity::new_local_with_id("tmp-1", budget("Home"), &context()))
            .unwrap();
        set.insert(known("42", "Home (fetched)")).unwrap();

        set.remap_id("tmp-1", "42").unwrap();
        assert_eq!(set.ids(), vec!["42".to_string()]);
        assert_eq!(set.get("42").unwrap().payload().title, "Home");
    }

    #[test]
    fn remap_unknown_id_fails() {
        let mut set: WorkingSet<Budget> = WorkingSet::new();
        assert!(matches!(
            set.remap_id("tmp-9", "9"),
            Err(CoreError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn selection_transition_reports_closed_id() {
        let mut set = WorkingSet::new();
        set.insert(known("1", "Rent")).unwrap();
        set.insert(known("2", "Fuel")).unwrap();

        assert_eq!(set.select(Some("1")), None);
        assert!(set.get("1").unwrap().shadow().is_some());

        // Re-selecting the same id is not a transition.
        assert_eq!(set.select(Some("1")), None);

        assert_eq!(set.select(Some("2")), Some("1".to_string()));
        assert_eq!(set.select(None), Some("2".to_string()));
        assert_eq!(set.select(None), None);
    }

    #[test]
    fn selecting_unknown_id_selects_nothing() {
        let mut set: WorkingSet<Budget> = WorkingSet::new();
        assert_eq!(set.select(Some("404")), None);
        assert_eq!(set.selected(), None);
    }

    #[test]
    fn removed_selection_is_not_reported() {
        let mut set = WorkingSet::new();
        set.insert(known("1", "Rent")).unwrap();
        set.select(Some("1"));
        set.remove("1");
        assert_eq!(set.select(None), None);
    }

    #[test]
    fn mark_deleted_sets_action() {
        let mut set = WorkingSet::new();
        set.insert(known("1", "Rent")).unwrap();
        set.mark_deleted("1").unwrap();
        assert_eq!(set.get("1").unwrap().action(), Action::Delete);
        assert!(set.mark_deleted("2").is_err());
    }

    #[test]
    fn active_filters_soft_deleted() {
        let mut set = WorkingSet::new();
        set.insert(known("1", "Rent")).unwrap();
        set.insert(known("2", "Old").with_active(false)).unwrap();
        let active: Vec<_> = set.active().map(|e| e.id()).collect();
        assert_eq!(active, vec!["1"]);
    }
}
