//! SQLite-backed issue store with in-process change notification.
//!
//! # Responsibility
//! - Persist issues in the `issues` table and assign ids and timestamps.
//! - Re-read the full ordered collection after each accepted write and push
//!   it to every live subscription.
//!
//! # Invariants
//! - Writes, revision bumps and publishes happen under one lock, so the
//!   publish order equals the write order.
//! - The store clock never repeats or goes backwards, including across
//!   reopening the same database file.
//! - Rows that do not parse into a valid `Issue` are quarantined: counted,
//!   logged, and never delivered.

use crate::db::migrations::apply_migrations;
use crate::db::{open_db, open_db_in_memory};
use crate::model::issue::{Issue, IssueId, IssuePriority, IssueStatus, NewIssue, Timestamp};
use crate::store::subscription::{Subscription, SubscriptionHub};
use crate::store::{IssueStore, PersistenceError, PersistenceResult, Snapshot};
use log::{error, info, warn};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const ISSUE_SNAPSHOT_SQL: &str = "SELECT
    id,
    title,
    description,
    priority,
    status,
    assigned_to,
    created_by,
    created_at,
    updated_at
FROM issues
ORDER BY created_at DESC, id ASC";

const CLOSED_REASON: &str = "issue store closed";

/// Strictly increasing millisecond clock owned by the store.
#[derive(Debug, Clone, Copy)]
struct ServerClock {
    last: Timestamp,
}

impl ServerClock {
    fn stamp(&mut self) -> Timestamp {
        let next = wall_clock_ms().max(self.last.saturating_add(1));
        self.last = next;
        next
    }
}

struct StoreState {
    conn: Connection,
    clock: ServerClock,
    revision: u64,
    closed: bool,
}

/// Issue store over one SQLite connection.
///
/// Share it between sessions with `Arc<SqliteIssueStore>`.
pub struct SqliteIssueStore {
    state: Mutex<StoreState>,
    hub: Arc<SubscriptionHub>,
}

impl SqliteIssueStore {
    /// Opens (or creates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps an existing connection, migrating it first.
    ///
    /// The store clock is seeded from the newest persisted timestamp.
    pub fn from_connection(mut conn: Connection) -> PersistenceResult<Self> {
        apply_migrations(&mut conn)?;
        let last: Timestamp = conn.query_row(
            "SELECT COALESCE(MAX(MAX(created_at), MAX(updated_at)), 0) FROM issues;",
            [],
            |row| row.get(0),
        )?;

        Ok(Self {
            state: Mutex::new(StoreState {
                conn,
                clock: ServerClock { last },
                revision: 0,
                closed: false,
            }),
            hub: SubscriptionHub::new(),
        })
    }

    /// Ends every live subscription and refuses further operations.
    pub fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.closed {
            return;
        }
        state.closed = true;
        let notified = self.hub.terminate_all(CLOSED_REASON);
        info!("event=store_close module=store status=ok notified={notified}");
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn lock_open(&self) -> PersistenceResult<MutexGuard<'_, StoreState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".to_string()))?;
        if state.closed {
            return Err(PersistenceError::Unavailable(CLOSED_REASON.to_string()));
        }
        Ok(state)
    }

    /// Bumps the revision and pushes the new state to subscribers.
    ///
    /// A failed re-read ends all subscriptions instead of failing the write
    /// that already committed.
    fn publish_after_write(&self, state: &mut StoreState) {
        state.revision += 1;
        match read_snapshot(&state.conn, state.revision) {
            Ok(snapshot) => {
                self.hub.publish(Arc::new(snapshot));
            }
            Err(err) => {
                error!(
                    "event=snapshot_publish module=store status=error revision={} error={}",
                    state.revision, err
                );
                self.hub
                    .terminate_all(&format!("snapshot read failed: {err}"));
            }
        }
    }
}

impl IssueStore for SqliteIssueStore {
    fn subscribe(&self) -> PersistenceResult<Subscription> {
        let state = self.lock_open()?;
        let initial = read_snapshot(&state.conn, state.revision)?;
        Ok(self.hub.register(Arc::new(initial)))
    }

    fn snapshot(&self) -> PersistenceResult<Snapshot> {
        let state = self.lock_open()?;
        read_snapshot(&state.conn, state.revision)
    }

    fn create(&self, issue: &NewIssue) -> PersistenceResult<IssueId> {
        if issue.title.trim().is_empty() || issue.created_by.trim().is_empty() {
            return Err(PersistenceError::InvalidData(
                "refusing to write issue with blank title or creator".to_string(),
            ));
        }

        let mut state = self.lock_open()?;
        let id = Uuid::new_v4();
        let stamp = state.clock.stamp();

        let inserted = state.conn.execute(
            "INSERT INTO issues (
                id,
                title,
                description,
                priority,
                status,
                assigned_to,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8);",
            params![
                id.to_string(),
                issue.title.as_str(),
                issue.description.as_str(),
                priority_to_db(issue.priority),
                status_to_db(IssueStatus::Open),
                issue.assigned_to.as_deref(),
                issue.created_by.as_str(),
                stamp,
            ],
        );
        if let Err(err) = inserted {
            error!("event=issue_create module=store status=error error={err}");
            return Err(err.into());
        }

        self.publish_after_write(&mut state);
        info!(
            "event=issue_create module=store status=ok issue_id={} revision={}",
            id, state.revision
        );
        Ok(id)
    }

    fn update_status(&self, id: IssueId, status: IssueStatus) -> PersistenceResult<()> {
        let mut state = self.lock_open()?;
        let stamp = state.clock.stamp();

        let changed = match state.conn.execute(
            "UPDATE issues
             SET status = ?1, updated_at = ?2
             WHERE id = ?3;",
            params![status_to_db(status), stamp, id.to_string()],
        ) {
            Ok(changed) => changed,
            Err(err) => {
                error!(
                    "event=issue_update_status module=store status=error issue_id={id} error={err}"
                );
                return Err(err.into());
            }
        };
        if changed == 0 {
            return Err(PersistenceError::NotFound(id));
        }

        self.publish_after_write(&mut state);
        info!(
            "event=issue_update_status module=store status=ok issue_id={} new_status={} revision={}",
            id,
            status_to_db(status),
            state.revision
        );
        Ok(())
    }
}

fn read_snapshot(conn: &Connection, revision: u64) -> PersistenceResult<Snapshot> {
    let mut stmt = conn.prepare(ISSUE_SNAPSHOT_SQL)?;
    let mut rows = stmt.query([])?;
    let mut snapshot = Snapshot {
        revision,
        ..Snapshot::default()
    };

    while let Some(row) = rows.next()? {
        match parse_issue_row(row) {
            Ok(issue) => snapshot.issues.push(issue),
            Err(reason) => {
                snapshot.quarantined += 1;
                warn!(
                    "event=issue_quarantine module=store status=skipped revision={revision} reason={reason}"
                );
            }
        }
    }

    Ok(snapshot)
}

fn parse_issue_row(row: &Row<'_>) -> Result<Issue, PersistenceError> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid uuid `{id_text}` in issues.id"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_priority(&priority_text).ok_or_else(|| {
        PersistenceError::InvalidData(format!(
            "invalid priority `{priority_text}` for issue {id}"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        PersistenceError::InvalidData(format!("invalid status `{status_text}` for issue {id}"))
    })?;

    let issue = Issue {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        status,
        assigned_to: row.get("assigned_to")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    issue
        .validate()
        .map_err(|err| PersistenceError::InvalidData(format!("issue {id}: {err}")))?;
    Ok(issue)
}

fn wall_clock_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Timestamp::try_from(elapsed.as_millis()).unwrap_or(Timestamp::MAX))
        .unwrap_or(0)
}

fn status_to_db(status: IssueStatus) -> &'static str {
    match status {
        IssueStatus::Open => "open",
        IssueStatus::InProgress => "in_progress",
        IssueStatus::Done => "done",
    }
}

fn parse_status(value: &str) -> Option<IssueStatus> {
    match value {
        "open" => Some(IssueStatus::Open),
        "in_progress" => Some(IssueStatus::InProgress),
        "done" => Some(IssueStatus::Done),
        _ => None,
    }
}

fn priority_to_db(priority: IssuePriority) -> &'static str {
    match priority {
        IssuePriority::Low => "low",
        IssuePriority::Medium => "medium",
        IssuePriority::High => "high",
    }
}

fn parse_priority(value: &str) -> Option<IssuePriority> {
    match value {
        "low" => Some(IssuePriority::Low),
        "medium" => Some(IssuePriority::Medium),
        "high" => Some(IssuePriority::High),
        _ => None,
    }
}
