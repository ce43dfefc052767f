use issue_sync_core::store::SubscriptionHub;
use issue_sync_core::{
    Identity, Issue, IssueDraft, IssueId, IssueStatus, IssueStore, IssueValidationError,
    MutationError, MutationGateway, NewIssue, PersistenceError, PersistenceResult, Snapshot,
    SqliteIssueStore, Subscription, TransitionRejected,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Store double that records calls and fails every write.
struct RejectingStore {
    hub: Arc<SubscriptionHub>,
    writes: AtomicUsize,
}

impl RejectingStore {
    fn new() -> Self {
        Self {
            hub: SubscriptionHub::new(),
            writes: AtomicUsize::new(0),
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl IssueStore for RejectingStore {
    fn subscribe(&self) -> PersistenceResult<Subscription> {
        Ok(self.hub.register(Arc::new(Snapshot::default())))
    }

    fn snapshot(&self) -> PersistenceResult<Snapshot> {
        Ok(Snapshot::default())
    }

    fn create(&self, _issue: &NewIssue) -> PersistenceResult<IssueId> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::Unavailable("quota exceeded".to_string()))
    }

    fn update_status(&self, id: IssueId, _status: IssueStatus) -> PersistenceResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::NotFound(id))
    }
}

fn identity() -> Identity {
    Identity::new("ana@example.com").unwrap()
}

fn sqlite_gateway() -> MutationGateway<Arc<SqliteIssueStore>> {
    let store = Arc::new(SqliteIssueStore::open_in_memory().unwrap());
    MutationGateway::new(store, identity())
}

fn current(gateway: &MutationGateway<Arc<SqliteIssueStore>>, id: IssueId) -> Issue {
    gateway.store().snapshot().unwrap().get(id).cloned().unwrap()
}

#[test]
fn create_stamps_creator_from_gateway_identity() {
    let gateway = sqlite_gateway();
    let created = gateway
        .create_issue(&IssueDraft::new("Fix login page"), &[])
        .unwrap();

    assert!(created.duplicates.is_empty());
    let issue = current(&gateway, created.id);
    assert_eq!(issue.created_by, "ana@example.com");
    assert_eq!(issue.status, IssueStatus::Open);
}

#[test]
fn blank_title_is_a_validation_error_without_store_contact() {
    let store = Arc::new(RejectingStore::new());
    let gateway = MutationGateway::new(Arc::clone(&store), identity());

    let err = gateway
        .create_issue(&IssueDraft::new("  "), &[])
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::Validation(IssueValidationError::EmptyTitle)
    ));
    assert_eq!(store.writes(), 0);
}

#[test]
fn duplicates_are_reported_but_never_block_creation() {
    let gateway = sqlite_gateway();
    let existing = gateway
        .create_issue(&IssueDraft::new("Fix login page"), &[])
        .unwrap();
    let known = gateway.store().snapshot().unwrap().issues;

    let created = gateway
        .create_issue(&IssueDraft::new("Login page broken"), &known)
        .unwrap();

    assert_eq!(created.duplicates.len(), 1);
    assert_eq!(created.duplicates.matches[0].id, existing.id);
    assert_eq!(gateway.store().snapshot().unwrap().len(), 2);
}

#[test]
fn check_duplicates_creates_nothing() {
    let gateway = sqlite_gateway();
    gateway
        .create_issue(&IssueDraft::new("Fix login page"), &[])
        .unwrap();
    let known = gateway.store().snapshot().unwrap().issues;

    let signal = gateway.check_duplicates("login bug", &known);
    assert_eq!(signal.len(), 1);
    assert!(gateway.check_duplicates("ab", &known).is_empty());
    assert_eq!(gateway.store().snapshot().unwrap().len(), 1);
}

#[test]
fn open_to_done_is_rejected_locally_with_the_pair() {
    let store = Arc::new(RejectingStore::new());
    let gateway = MutationGateway::new(Arc::clone(&store), identity());
    let issue = Issue {
        id: IssueId::new_v4(),
        title: "Fix login page".to_string(),
        description: String::new(),
        priority: Default::default(),
        status: IssueStatus::Open,
        assigned_to: None,
        created_by: "ana@example.com".to_string(),
        created_at: 1,
        updated_at: 1,
    };

    let err = gateway.update_status(&issue, IssueStatus::Done).unwrap_err();
    match err {
        MutationError::TransitionRejected(TransitionRejected { current, target }) => {
            assert_eq!(current, IssueStatus::Open);
            assert_eq!(target, IssueStatus::Done);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.writes(), 0);
}

#[test]
fn persistence_errors_surface_verbatim_without_retry() {
    let store = Arc::new(RejectingStore::new());
    let gateway = MutationGateway::new(Arc::clone(&store), identity());

    let create_err = gateway
        .create_issue(&IssueDraft::new("Crash on save"), &[])
        .unwrap_err();
    match create_err {
        MutationError::Persistence(PersistenceError::Unavailable(reason)) => {
            assert_eq!(reason, "quota exceeded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.writes(), 1);

    let issue = Issue {
        id: IssueId::new_v4(),
        title: "Crash on save".to_string(),
        description: String::new(),
        priority: Default::default(),
        status: IssueStatus::InProgress,
        assigned_to: None,
        created_by: "ana@example.com".to_string(),
        created_at: 1,
        updated_at: 1,
    };
    let update_err = gateway
        .update_status(&issue, IssueStatus::Done)
        .unwrap_err();
    assert!(matches!(
        update_err,
        MutationError::Persistence(PersistenceError::NotFound(id)) if id == issue.id
    ));
    assert_eq!(store.writes(), 2);
}

#[test]
fn status_walks_the_allowed_edges() {
    let gateway = sqlite_gateway();
    let id = gateway
        .create_issue(&IssueDraft::new("Crash on save"), &[])
        .unwrap()
        .id;

    for target in [
        IssueStatus::InProgress,
        IssueStatus::Done,
        IssueStatus::Done,
        IssueStatus::InProgress,
        IssueStatus::Open,
    ] {
        let issue = current(&gateway, id);
        gateway.update_status(&issue, target).unwrap();
        assert_eq!(current(&gateway, id).status, target);
    }
}
