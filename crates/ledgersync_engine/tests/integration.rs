//! Integration tests for the submit protocol, reconciliation and recovery.

use ledgersync_core::{Action, DurableMirror, Entity, MirrorKey, Synchronizable, WorkingSet};
use ledgersync_engine::{
    CollectionReconciler, MockAuthority, Notice, RecordingNotifier, SubmitOutcome, SyncConfig,
    SyncCoordinator, SyncError,
};
use ledgersync_protocol::RemoteFailure;
use ledgersync_storage::{InMemoryBackend, StorageBackend};
use ledgersync_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

type Coordinator<B> = SyncCoordinator<MockAuthority, B, RecordingNotifier>;

fn coordinator_with<B: StorageBackend>(
    remote: Arc<MockAuthority>,
    mirror: Arc<DurableMirror<B>>,
) -> Coordinator<B> {
    let config = SyncConfig::new(test_context()).with_request_timeout(Duration::from_secs(2));
    SyncCoordinator::new(config, remote, mirror, RecordingNotifier::new())
}

fn coordinator() -> Coordinator<InMemoryBackend> {
    coordinator_with(Arc::new(MockAuthority::starting_at(42)), memory_mirror())
}

/// Seeds a confirmed keyword into the remote, the mirror and the set.
fn known_keyword<B: StorageBackend>(
    coordinator: &Coordinator<B>,
    set: &mut WorkingSet<Keyword>,
    id: &str,
    title: &str,
) {
    let entity = confirmed(id, Keyword::new(title));
    coordinator.remote().seed_entity(&entity).unwrap();
    coordinator.mirror().upsert(&entity, false).unwrap();
    set.insert(entity).unwrap();
}

#[tokio::test]
async fn unchanged_edit_is_a_no_op() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    let entity = confirmed("7", Keyword::new("Rent"));
    set.insert(entity).unwrap();
    set.select(Some("7"));
    let due = set.select(None).unwrap();

    let outcome = coordinator.submit(&mut set, &due).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Unchanged);
    assert_eq!(coordinator.remote().request_count(), 0);
    assert!(coordinator.mirror().is_empty());
    assert!(coordinator.mirror().backend().load().unwrap().is_none());
    assert_eq!(coordinator.stats().skipped, 1);
}

#[tokio::test]
async fn created_record_is_remapped_everywhere() {
    let coordinator = coordinator();
    let mut categories = WorkingSet::new();
    let mut keywords = WorkingSet::new();

    let temp_id = categories.create_local(EventCategory::new("Food"), coordinator.context());
    let keyword = confirmed(
        "5",
        Keyword::new("Bakery").with_category(temp_id.clone(), EventCategory::new("Food")),
    );
    coordinator.mirror().upsert(&keyword, false).unwrap();
    keywords.insert(keyword).unwrap();

    let outcome = coordinator.submit(&mut categories, &temp_id).await.unwrap();
    let (old, server_id) = match outcome {
        SubmitOutcome::Created { temp_id, server_id } => (temp_id, server_id),
        other => panic!("expected a creation, got {other:?}"),
    };
    assert_eq!(old, temp_id);
    assert_eq!(server_id, "42");
    let changed = coordinator
        .propagate_remap(&mut keywords, EventCategory::KIND, &old, &server_id)
        .unwrap();
    assert_eq!(changed, 1);

    assert_eq!(categories.ids(), vec!["42"]);
    assert_eq!(categories.get("42").unwrap().action(), Action::Edit);

    let mirror = coordinator.mirror();
    assert!(mirror.get(&MirrorKey::of::<EventCategory>(&temp_id)).is_none());
    let record = mirror.get(&MirrorKey::of::<EventCategory>("42")).unwrap();
    assert!(!record.pending);

    let keyword_record = mirror.get(&MirrorKey::of::<Keyword>("5")).unwrap();
    assert!(keyword_record.references_target(EventCategory::KIND, "42"));
    assert!(!keyword_record.references_target(EventCategory::KIND, &temp_id));
    let rebuilt: Entity<Keyword> = keyword_record.to_entity().unwrap();
    assert_eq!(rebuilt.payload().category_id.as_deref(), Some("42"));

    let keyword = keywords.get("5").unwrap();
    assert_eq!(keyword.payload().category_id.as_deref(), Some("42"));
    assert!(!keyword.has_changes());
}

#[tokio::test]
async fn failed_edit_rolls_back_action_and_keeps_pending() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    known_keyword(&coordinator, &mut set, "7", "Rent");

    set.select(Some("7"));
    set.get_mut("7").unwrap().payload_mut().title = "Housing".into();
    let due = set.select(None).unwrap();
    coordinator
        .remote()
        .fail_next(RemoteFailure::Transport("offline".into()));

    let error = coordinator.submit(&mut set, &due).await.unwrap_err();

    assert!(error.is_network());
    assert_eq!(set.get("7").unwrap().action(), Action::Edit);
    assert!(coordinator.mirror().is_pending(&MirrorKey::of::<Keyword>("7")));
    assert_eq!(
        coordinator.notifier().notices(),
        vec![Notice::WillRetryLater {
            kind: "keyword".into(),
            id: "7".into(),
        }]
    );
    assert_eq!(coordinator.stats().failed, 1);
}

#[tokio::test]
async fn absent_records_are_tombstoned() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    for (id, title) in [("1", "A"), ("2", "B"), ("3", "C")] {
        known_keyword(&coordinator, &mut set, id, title);
    }
    coordinator.remote().remove("keyword", "2");

    let report = coordinator.refresh(&mut set).await.unwrap();

    assert_eq!(set.ids(), vec!["1", "3"]);
    assert!(coordinator.mirror().get(&MirrorKey::of::<Keyword>("2")).is_none());
    assert_eq!(report.removed, 1);
}

#[tokio::test]
async fn pending_record_survives_absence() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    for (id, title) in [("1", "A"), ("2", "B"), ("3", "C")] {
        known_keyword(&coordinator, &mut set, id, title);
    }
    coordinator
        .mirror()
        .upsert(set.get("2").unwrap(), true)
        .unwrap();
    coordinator.remote().remove("keyword", "2");

    let report = coordinator.refresh(&mut set).await.unwrap();

    assert_eq!(set.ids(), vec!["1", "2", "3"]);
    assert!(coordinator.mirror().is_pending(&MirrorKey::of::<Keyword>("2")));
    assert_eq!(report.retained, 1);
    assert_eq!(report.removed, 0);
}

#[tokio::test]
async fn delete_mark_survives_refresh_and_is_submitted() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    known_keyword(&coordinator, &mut set, "7", "Rent");
    set.mark_deleted("7").unwrap();

    let report = coordinator.refresh(&mut set).await.unwrap();
    assert_eq!(report.retained, 1);
    assert_eq!(set.get("7").unwrap().action(), Action::Delete);

    let outcome = coordinator.submit(&mut set, "7").await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Deleted { id: "7".into() });
    assert!(set.is_empty());
    assert!(coordinator.mirror().get(&MirrorKey::of::<Keyword>("7")).is_none());
    assert!(coordinator.remote().records("keyword").is_empty());
}

#[tokio::test]
async fn blank_title_on_close_restores_and_notifies() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    known_keyword(&coordinator, &mut set, "7", "Rent");

    set.select(Some("7"));
    set.get_mut("7").unwrap().payload_mut().title = String::new();
    let due = set.select(None).unwrap();

    let outcome = coordinator.submit(&mut set, &due).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Reverted);
    assert_eq!(set.get("7").unwrap().payload().title, "Rent");
    assert_eq!(coordinator.remote().request_count(), 0);
    assert!(!coordinator.mirror().is_pending(&MirrorKey::of::<Keyword>("7")));
    assert!(matches!(
        coordinator.notifier().notices().as_slice(),
        [Notice::Validation { id, .. }] if id == "7"
    ));
}

#[tokio::test]
async fn groceries_created_as_42() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    set.insert(Entity::new_local_with_id(
        "tmp-1",
        Keyword::new("Groceries"),
        coordinator.context(),
    ))
    .unwrap();

    let outcome = coordinator.submit(&mut set, "tmp-1").await.unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Created {
            temp_id: "tmp-1".into(),
            server_id: "42".into(),
        }
    );
    assert_eq!(set.len(), 1);
    let entity = set.get("42").unwrap();
    assert_eq!(entity.payload().title, "Groceries");
    assert_eq!(entity.action(), Action::Edit);
    assert!(coordinator
        .mirror()
        .get(&MirrorKey::of::<Keyword>("tmp-1"))
        .is_none());
    assert_eq!(coordinator.remote().records("keyword").len(), 1);
}

#[tokio::test]
async fn second_submit_for_same_record_fails_fast() {
    let coordinator = coordinator();
    coordinator.remote().set_delay(Duration::from_millis(50));
    let mut set = WorkingSet::new();
    set.insert(Entity::new_local_with_id(
        "tmp-1",
        Keyword::new("Groceries"),
        coordinator.context(),
    ))
    .unwrap();
    // A second set holding the same record, as after a drain on a fresh set.
    let mut copy = set.clone();

    let (first, second) = tokio::join!(
        coordinator.submit(&mut set, "tmp-1"),
        coordinator.submit(&mut copy, "tmp-1")
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SyncError::SubmissionInFlight { .. })));
    assert_eq!(coordinator.remote().request_count(), 1);
    assert!(!coordinator.is_in_flight(&MirrorKey::of::<Keyword>("tmp-1")));
}

#[tokio::test]
async fn pending_work_is_drained_after_restart() {
    let temp = TempMirror::new();
    let remote = Arc::new(MockAuthority::starting_at(42));
    let created_id;

    {
        let coordinator = coordinator_with(Arc::clone(&remote), temp.open());
        let mut set = WorkingSet::new();
        known_keyword(&coordinator, &mut set, "7", "Rent");
        created_id = set.create_local(Keyword::new("Groceries"), coordinator.context());

        remote.fail_next(RemoteFailure::Timeout);
        assert!(coordinator.submit(&mut set, &created_id).await.is_err());

        set.select(Some("7"));
        set.get_mut("7").unwrap().payload_mut().title = "Housing".into();
        remote.fail_next(RemoteFailure::status(502, "bad gateway"));
        assert!(coordinator.submit(&mut set, "7").await.is_err());

        assert_eq!(coordinator.mirror().pending(Some("keyword")).len(), 2);
    }

    let coordinator = coordinator_with(Arc::clone(&remote), temp.open());
    let mut set: WorkingSet<Keyword> = WorkingSet::new();

    let report = coordinator.drain_pending(&mut set).await.unwrap();

    assert_eq!(report.submitted, 2);
    assert_eq!(report.failed, 0);
    assert!(coordinator.mirror().pending(None).is_empty());
    assert!(coordinator
        .mirror()
        .get(&MirrorKey::of::<Keyword>(&created_id))
        .is_none());

    let mut titles: Vec<String> = set.iter().map(|e| e.payload().title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Groceries", "Housing"]);
    assert!(set.contains("42"));
    assert!(set.contains("7"));
    assert_eq!(
        remote.record("keyword", "7").map(|r| r.payload),
        Some(ledgersync_core::codec::to_cbor(&Keyword::new("Housing")).unwrap())
    );
}

#[tokio::test]
async fn pending_delete_is_drained() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    known_keyword(&coordinator, &mut set, "7", "Rent");
    set.mark_deleted("7").unwrap();
    coordinator
        .remote()
        .fail_next(RemoteFailure::Transport("offline".into()));
    assert!(coordinator.submit(&mut set, "7").await.is_err());
    assert_eq!(set.get("7").unwrap().action(), Action::Edit);

    let mut fresh: WorkingSet<Keyword> = WorkingSet::new();
    let report = coordinator.drain_pending(&mut fresh).await.unwrap();

    assert_eq!(report.submitted, 1);
    assert!(fresh.is_empty());
    assert!(coordinator.mirror().is_empty());
    assert!(coordinator.remote().records("keyword").is_empty());
}

#[tokio::test]
async fn failed_fetch_notifies_and_applies_nothing() {
    let coordinator = coordinator();
    let mut set = WorkingSet::new();
    known_keyword(&coordinator, &mut set, "7", "Rent");
    coordinator
        .remote()
        .fail_next(RemoteFailure::status(500, "boom"));

    let error = coordinator.refresh(&mut set).await.unwrap_err();

    assert!(error.is_network());
    assert_eq!(set.ids(), vec!["7"]);
    assert_eq!(
        coordinator.notifier().notices(),
        vec![Notice::FetchFailed {
            kind: "keyword".into()
        }]
    );
}

#[tokio::test]
async fn malformed_fetched_date_is_a_decode_error() {
    let coordinator = coordinator();
    let mut set: WorkingSet<Keyword> = WorkingSet::new();
    let mut record = remote_record("9", Keyword::new("Fuel"));
    record.updated_date = "yesterday".into();
    coordinator.remote().seed("keyword", record);
    coordinator
        .remote()
        .seed("keyword", remote_record("10", Keyword::new("Rent")));

    let error = coordinator.refresh(&mut set).await.unwrap_err();

    assert!(matches!(
        error,
        SyncError::Core(ledgersync_core::CoreError::Decode { .. })
    ));
    assert!(set.is_empty());
    assert!(coordinator.mirror().is_empty());
}

proptest! {
    #[test]
    fn reconcile_keeps_fetched_and_pending_only(case in reconcile_case_strategy(12)) {
        let mirror = DurableMirror::open(InMemoryBackend::new()).unwrap();
        let mut set = WorkingSet::new();
        for id in &case.local {
            let entity = confirmed(id.clone(), Keyword::new(format!("local {id}")));
            mirror.upsert(&entity, case.pending.contains(id)).unwrap();
            set.insert(entity).unwrap();
        }
        let fetched: Vec<_> = case
            .fetched
            .iter()
            .map(|id| confirmed(id.clone(), Keyword::new(format!("remote {id}"))))
            .collect();

        CollectionReconciler::new().run(fetched, &mut set, &mirror).unwrap();

        let expected: std::collections::BTreeSet<String> =
            case.fetched.union(&case.pending).cloned().collect();
        let actual: std::collections::BTreeSet<String> = set.ids().into_iter().collect();
        prop_assert_eq!(&actual, &expected);

        for record in mirror.records(Keyword::KIND) {
            prop_assert!(record.pending || case.fetched.contains(&record.key.id));
        }
        for id in &case.pending {
            prop_assert!(mirror.is_pending(&MirrorKey::of::<Keyword>(id.clone())));
            let title = &set.get(id).unwrap().payload().title;
            prop_assert_eq!(title, &format!("local {id}"));
        }
    }
}
