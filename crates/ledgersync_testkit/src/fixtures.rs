//! Fixture entities and mirror helpers.
//!
//! The fixtures model the finance client's editable lists: keywords that
//! point at an event category (embedded, so it can be rebuilt on cold
//! start), and event categories that belong to a category group.

use ledgersync_core::{
    AuditInfo, CoreResult, DurableMirror, Entity, ForeignKeyStub, SyncContext, Synchronizable,
};
use ledgersync_protocol::RemoteRecord;
use ledgersync_storage::{FileBackend, InMemoryBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A group of event categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Display title. Required.
    pub title: String,
    /// Hex color.
    pub color: String,
}

impl CategoryGroup {
    /// A group with a default color.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: "#607d8b".into(),
        }
    }
}

impl Synchronizable for CategoryGroup {
    const KIND: &'static str = "category_group";

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.title).then_some("title")
    }
}

/// A category events and keywords are filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCategory {
    /// Display title. Required.
    pub title: String,
    /// Hex color.
    pub color: String,
    /// Owning [`CategoryGroup`].
    pub group_id: Option<String>,
}

impl EventCategory {
    /// An ungrouped category with a default color.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: "#4caf50".into(),
            group_id: None,
        }
    }

    /// Places the category in a group.
    #[must_use]
    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

impl Synchronizable for EventCategory {
    const KIND: &'static str = "event_category";

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.title).then_some("title")
    }

    fn foreign_keys(&self) -> CoreResult<Vec<ForeignKeyStub>> {
        Ok(self
            .group_id
            .iter()
            .map(|id| ForeignKeyStub::reference(CategoryGroup::KIND, id.clone()))
            .collect())
    }

    fn remap_reference(&mut self, kind: &str, old_id: &str, new_id: &str) -> bool {
        remap(&mut self.group_id, kind == CategoryGroup::KIND, old_id, new_id)
    }
}

/// A search keyword, optionally tied to an event category.
///
/// The category is embedded so a keyword can be shown before the category
/// list has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// Display title. Required.
    pub title: String,
    /// Hex color.
    pub color: String,
    /// Id of the linked [`EventCategory`].
    pub category_id: Option<String>,
    /// Embedded copy of the linked category.
    pub category: Option<EventCategory>,
}

impl Keyword {
    /// A keyword with no category.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: "#2196f3".into(),
            category_id: None,
            category: None,
        }
    }

    /// Links the keyword to a category, embedding a copy of it.
    #[must_use]
    pub fn with_category(mut self, id: impl Into<String>, category: EventCategory) -> Self {
        self.category_id = Some(id.into());
        self.category = Some(category);
        self
    }
}

impl Synchronizable for Keyword {
    const KIND: &'static str = "keyword";

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.title).then_some("title")
    }

    fn foreign_keys(&self) -> CoreResult<Vec<ForeignKeyStub>> {
        let Some(id) = &self.category_id else {
            return Ok(Vec::new());
        };
        let stub = match &self.category {
            Some(category) => ForeignKeyStub::embed(EventCategory::KIND, id.clone(), category)?,
            None => ForeignKeyStub::reference(EventCategory::KIND, id.clone()),
        };
        Ok(vec![stub])
    }

    fn remap_reference(&mut self, kind: &str, old_id: &str, new_id: &str) -> bool {
        remap(&mut self.category_id, kind == EventCategory::KIND, old_id, new_id)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn remap(slot: &mut Option<String>, kind_matches: bool, old_id: &str, new_id: &str) -> bool {
    if kind_matches && slot.as_deref() == Some(old_id) {
        *slot = Some(new_id.to_string());
        return true;
    }
    false
}

/// The context used throughout tests.
pub fn test_context() -> SyncContext {
    SyncContext::new("acct-test", "tester", "device-test")
}

/// A server-confirmed entity with default audit fields.
pub fn confirmed<P: Synchronizable>(id: impl Into<String>, payload: P) -> Entity<P> {
    Entity::new(id, payload, AuditInfo::default())
}

/// The wire form of a confirmed entity.
pub fn remote_record<P: Synchronizable>(id: impl Into<String>, payload: P) -> RemoteRecord {
    RemoteRecord::from_entity(&confirmed(id, payload)).expect("Failed to encode fixture")
}

/// An empty mirror over an in-memory backend.
pub fn memory_mirror() -> Arc<DurableMirror<InMemoryBackend>> {
    Arc::new(DurableMirror::open(InMemoryBackend::new()).expect("Failed to open mirror"))
}

/// A mirror file in a temporary directory that can be reopened to simulate
/// a restart.
pub struct TempMirror {
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempMirror {
    /// Creates a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mirror.cbor");
        Self {
            _temp_dir: temp_dir,
            path,
        }
    }

    /// Path of the mirror file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Opens (or reopens) the mirror.
    pub fn open(&self) -> Arc<DurableMirror<FileBackend>> {
        let backend = FileBackend::open(&self.path).expect("Failed to open file backend");
        Arc::new(DurableMirror::open(backend).expect("Failed to open mirror"))
    }
}

impl Default for TempMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::{EntityRef, MirrorKey};

    #[test]
    fn keyword_embeds_category() {
        let keyword = Keyword::new("Bakery").with_category("7", EventCategory::new("Food"));
        let stubs = keyword.foreign_keys().unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].target, EntityRef::new("event_category", "7"));
        assert!(stubs[0].payload.is_some());
    }

    #[test]
    fn remap_only_touches_matching_kind() {
        let mut keyword = Keyword::new("Bakery").with_category("tmp-1", EventCategory::new("Food"));
        assert!(!keyword.remap_reference("category_group", "tmp-1", "9"));
        assert!(keyword.remap_reference("event_category", "tmp-1", "9"));
        assert_eq!(keyword.category_id.as_deref(), Some("9"));
    }

    #[test]
    fn blank_title_is_reported() {
        assert_eq!(Keyword::new(" ").missing_required_field(), Some("title"));
        assert_eq!(Keyword::new("Rent").missing_required_field(), None);
    }

    #[test]
    fn temp_mirror_reopens() {
        let temp = TempMirror::new();
        temp.open()
            .upsert(&confirmed("7", CategoryGroup::new("Home")), false)
            .unwrap();
        let reopened = temp.open();
        assert!(reopened
            .get(&MirrorKey::of::<CategoryGroup>("7"))
            .is_some());
    }
}
