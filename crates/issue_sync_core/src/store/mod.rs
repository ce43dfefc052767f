//! Store adapter contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the push-based store contract the live view and gateway rely on.
//! - Keep SQL and timestamp assignment inside the persistence boundary.
//!
//! # Invariants
//! - Every accepted write produces a new snapshot for every live subscriber,
//!   the writer's own subscription included.
//! - `created_at`/`updated_at` come from the store clock, never from callers.
//! - Snapshots are ordered by `created_at DESC, id ASC`.

use crate::db::DbError;
use crate::model::issue::{Issue, IssueId, IssueStatus, NewIssue};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod sqlite_store;
pub mod subscription;

pub use sqlite_store::SqliteIssueStore;
pub use subscription::{Subscription, SubscriptionEvent, SubscriptionHub, SubscriptionId};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Store read/write failure, surfaced to callers unchanged.
#[derive(Debug)]
pub enum PersistenceError {
    Db(DbError),
    /// Target issue does not exist.
    NotFound(IssueId),
    /// Persisted state could not be interpreted.
    InvalidData(String),
    /// Store is closed or its lock is unusable.
    Unavailable(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "issue not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted issue data: {message}"),
            Self::Unavailable(reason) => write!(f, "issue store unavailable: {reason}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Full, ordered state of the collection at one store revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Store-assigned, increases with every accepted write.
    pub revision: u64,
    /// Newest `created_at` first.
    pub issues: Vec<Issue>,
    /// Rows skipped because they did not form a valid issue.
    pub quarantined: usize,
}

impl Snapshot {
    pub fn get(&self, id: IssueId) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Persistent issue collection with push-based change notification.
pub trait IssueStore: Send + Sync {
    /// Opens a live subscription; the current snapshot is delivered first.
    fn subscribe(&self) -> PersistenceResult<Subscription>;
    /// Reads the current snapshot once.
    fn snapshot(&self) -> PersistenceResult<Snapshot>;
    /// Persists a new issue with status `Open` and returns its assigned id.
    fn create(&self, issue: &NewIssue) -> PersistenceResult<IssueId>;
    /// Overwrites the status of an existing issue and restamps `updated_at`.
    fn update_status(&self, id: IssueId, status: IssueStatus) -> PersistenceResult<()>;
}

impl<S: IssueStore + ?Sized> IssueStore for Arc<S> {
    fn subscribe(&self) -> PersistenceResult<Subscription> {
        (**self).subscribe()
    }

    fn snapshot(&self) -> PersistenceResult<Snapshot> {
        (**self).snapshot()
    }

    fn create(&self, issue: &NewIssue) -> PersistenceResult<IssueId> {
        (**self).create(issue)
    }

    fn update_status(&self, id: IssueId, status: IssueStatus) -> PersistenceResult<()> {
        (**self).update_status(id, status)
    }
}
