use issue_sync_core::db::open_db_in_memory;
use issue_sync_core::{
    IssueDraft, IssuePriority, IssueStatus, IssueStore, NewIssue, PersistenceError,
    SqliteIssueStore, SubscriptionEvent,
};
use rusqlite::params;
use uuid::Uuid;

fn new_issue(title: &str) -> NewIssue {
    NewIssue::from_draft(&IssueDraft::new(title), "ana@example.com")
}

fn expect_snapshot(event: Option<SubscriptionEvent>) -> std::sync::Arc<issue_sync_core::Snapshot> {
    match event {
        Some(SubscriptionEvent::Snapshot(snapshot)) => snapshot,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[test]
fn create_assigns_id_defaults_and_server_timestamps() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let draft = IssueDraft::new("Fix login page")
        .with_description("500 on submit")
        .with_priority(IssuePriority::High)
        .with_assignee("bo@example.com");
    let id = store
        .create(&NewIssue::from_draft(&draft, "ana@example.com"))
        .unwrap();

    let snapshot = store.snapshot().unwrap();
    let issue = snapshot.get(id).unwrap();
    assert_eq!(issue.title, "Fix login page");
    assert_eq!(issue.description, "500 on submit");
    assert_eq!(issue.priority, IssuePriority::High);
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.assigned_to.as_deref(), Some("bo@example.com"));
    assert_eq!(issue.created_by, "ana@example.com");
    assert!(issue.created_at > 0);
    assert_eq!(issue.created_at, issue.updated_at);
}

#[test]
fn snapshot_is_ordered_newest_first() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let first = store.create(&new_issue("first")).unwrap();
    let second = store.create(&new_issue("second")).unwrap();
    let third = store.create(&new_issue("third")).unwrap();

    let ids: Vec<_> = store
        .snapshot()
        .unwrap()
        .issues
        .iter()
        .map(|issue| issue.id)
        .collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[test]
fn update_status_restamps_updated_at_only() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let id = store.create(&new_issue("Crash on save")).unwrap();
    let before = store.snapshot().unwrap().get(id).cloned().unwrap();

    store.update_status(id, IssueStatus::InProgress).unwrap();

    let after = store.snapshot().unwrap().get(id).cloned().unwrap();
    assert_eq!(after.status, IssueStatus::InProgress);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn update_status_of_missing_issue_is_not_found() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let missing = Uuid::new_v4();
    let err = store.update_status(missing, IssueStatus::Done).unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(id) if id == missing));
}

#[test]
fn blank_title_is_refused_at_the_write_boundary() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let err = store.create(&new_issue("   ")).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
    assert!(store.snapshot().unwrap().is_empty());
}

#[test]
fn every_write_reaches_every_subscriber_in_order() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let mut writer = store.subscribe().unwrap();
    let mut reader = store.subscribe().unwrap();
    assert_eq!(store.subscriber_count(), 2);

    let id = store.create(&new_issue("Fix login page")).unwrap();
    store.update_status(id, IssueStatus::InProgress).unwrap();

    for subscription in [&mut writer, &mut reader] {
        let initial = expect_snapshot(subscription.try_recv());
        assert_eq!(initial.revision, 0);
        assert!(initial.is_empty());

        let created = expect_snapshot(subscription.try_recv());
        assert_eq!(created.revision, 1);
        assert_eq!(created.get(id).unwrap().status, IssueStatus::Open);

        let updated = expect_snapshot(subscription.try_recv());
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.get(id).unwrap().status, IssueStatus::InProgress);

        assert!(subscription.try_recv().is_none());
    }
}

#[test]
fn rejected_write_publishes_nothing() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let mut subscription = store.subscribe().unwrap();
    expect_snapshot(subscription.try_recv());

    store
        .update_status(Uuid::new_v4(), IssueStatus::Done)
        .unwrap_err();
    assert!(subscription.try_recv().is_none());
}

#[test]
fn unsubscribed_stream_receives_nothing_more() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let mut subscription = store.subscribe().unwrap();
    store.create(&new_issue("buffered")).unwrap();

    subscription.unsubscribe();
    store.create(&new_issue("after unsubscribe")).unwrap();

    assert_eq!(store.subscriber_count(), 0);
    assert!(subscription.try_recv().is_none());
}

#[test]
fn close_terminates_subscriptions_once_and_refuses_operations() {
    let store = SqliteIssueStore::open_in_memory().unwrap();
    let mut subscription = store.subscribe().unwrap();
    expect_snapshot(subscription.try_recv());

    store.close();
    store.close();

    assert!(matches!(
        subscription.try_recv(),
        Some(SubscriptionEvent::Closed { .. })
    ));
    assert!(subscription.try_recv().is_none());
    assert!(!subscription.is_active());

    assert!(matches!(
        store.create(&new_issue("late")),
        Err(PersistenceError::Unavailable(_))
    ));
    assert!(matches!(
        store.subscribe(),
        Err(PersistenceError::Unavailable(_))
    ));
}

#[test]
fn malformed_rows_are_quarantined_not_delivered() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO issues (id, title, description, priority, status, assigned_to, created_by, created_at, updated_at)
         VALUES (?1, 'Legacy row', '', 'medium', 'closed', NULL, 'ana@example.com', 10, 10);",
        params![Uuid::new_v4().to_string()],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO issues (id, title, description, priority, status, assigned_to, created_by, created_at, updated_at)
         VALUES ('not-a-uuid', 'Broken id', '', 'low', 'open', NULL, 'ana@example.com', 20, 20);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO issues (id, title, description, priority, status, assigned_to, created_by, created_at, updated_at)
         VALUES (?1, 'Time travel', '', 'low', 'open', NULL, 'ana@example.com', 30, 5);",
        params![Uuid::new_v4().to_string()],
    )
    .unwrap();
    let valid_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO issues (id, title, description, priority, status, assigned_to, created_by, created_at, updated_at)
         VALUES (?1, 'Valid row', '', 'high', 'in_progress', 'bo@example.com', 'ana@example.com', 40, 50);",
        params![valid_id.to_string()],
    )
    .unwrap();

    let store = SqliteIssueStore::from_connection(conn).unwrap();
    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.quarantined, 3);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.issues[0].id, valid_id);
    assert_eq!(snapshot.issues[0].status, IssueStatus::InProgress);
}

#[test]
fn store_clock_never_goes_behind_persisted_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let far_future: i64 = 32_503_680_000_000;
    conn.execute(
        "INSERT INTO issues (id, title, description, priority, status, assigned_to, created_by, created_at, updated_at)
         VALUES (?1, 'From a fast clock', '', 'medium', 'open', NULL, 'ana@example.com', ?2, ?2);",
        params![Uuid::new_v4().to_string(), far_future],
    )
    .unwrap();

    let store = SqliteIssueStore::from_connection(conn).unwrap();
    let id = store.create(&new_issue("Newest")).unwrap();

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.issues[0].id, id);
    assert!(snapshot.issues[0].created_at > far_future);
}

#[test]
fn file_store_keeps_issues_and_clock_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.db");

    let (id, stamped) = {
        let store = SqliteIssueStore::open(&path).unwrap();
        let id = store.create(&new_issue("Persisted")).unwrap();
        store.update_status(id, IssueStatus::InProgress).unwrap();
        let stamped = store.snapshot().unwrap().get(id).unwrap().updated_at;
        (id, stamped)
    };

    let store = SqliteIssueStore::open(&path).unwrap();
    store.update_status(id, IssueStatus::Done).unwrap();
    let issue = store.snapshot().unwrap().get(id).cloned().unwrap();
    assert_eq!(issue.status, IssueStatus::Done);
    assert!(issue.updated_at > stamped);
}
