//! Explicitly owned client session.
//!
//! # Responsibility
//! - Bind one authenticated identity to one live view and one write gateway.
//! - Open the store subscription at login and release it at logout.
//!
//! # Invariants
//! - No state is shared through globals; everything hangs off the session.
//! - After `end` the view receives nothing further.

use crate::model::filter::IssueFilter;
use crate::model::identity::Identity;
use crate::model::issue::{IssueDraft, IssueId, IssueStatus};
use crate::rules::duplicate::DuplicateSignal;
use crate::service::mutation_gateway::{CreatedIssue, MutationError, MutationGateway};
use crate::store::{IssueStore, PersistenceError, PersistenceResult, Snapshot};
use crate::view::live_view::LiveViewController;
use log::info;
use std::sync::Arc;

/// Live session of one signed-in client against a shared store.
pub struct Session<S: IssueStore> {
    view: LiveViewController,
    gateway: MutationGateway<S>,
}

impl<S: IssueStore> Session<S> {
    /// Subscribes to `store` on behalf of `identity`.
    pub fn start(store: S, identity: Identity) -> PersistenceResult<Self> {
        Self::start_with_filter(store, identity, IssueFilter::default())
    }

    pub fn start_with_filter(
        store: S,
        identity: Identity,
        filter: IssueFilter,
    ) -> PersistenceResult<Self> {
        let subscription = store.subscribe()?;
        let view = LiveViewController::with_filter(subscription, filter);
        info!(
            "event=session_start module=session status=ok revision={} issues={}",
            view.snapshot().revision,
            view.snapshot().len()
        );
        Ok(Self {
            view,
            gateway: MutationGateway::new(store, identity),
        })
    }

    pub fn identity(&self) -> &Identity {
        self.gateway.identity()
    }

    pub fn view(&self) -> &LiveViewController {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut LiveViewController {
        &mut self.view
    }

    pub fn gateway(&self) -> &MutationGateway<S> {
        &self.gateway
    }

    /// Duplicate signal for a title being typed, against the latest snapshot.
    pub fn check_duplicates(&mut self, title: &str) -> DuplicateSignal {
        let snapshot = self.catch_up();
        self.gateway.check_duplicates(title, &snapshot.issues)
    }

    /// Creates an issue, checking duplicates against the latest snapshot.
    pub fn create_issue(&mut self, draft: &IssueDraft) -> Result<CreatedIssue, MutationError> {
        let snapshot = self.catch_up();
        self.gateway.create_issue(draft, &snapshot.issues)
    }

    /// Changes the status of an issue visible in the latest snapshot.
    ///
    /// An id missing from the snapshot fails with `PersistenceError::NotFound`
    /// without contacting the store.
    pub fn update_status(&mut self, id: IssueId, target: IssueStatus) -> Result<(), MutationError> {
        let snapshot = self.catch_up();
        let issue = snapshot
            .get(id)
            .ok_or_else(|| MutationError::Persistence(PersistenceError::NotFound(id)))?;
        self.gateway.update_status(issue, target)
    }

    /// Releases the subscription. Consumes the session.
    pub fn end(mut self) {
        self.view.unsubscribe();
        info!(
            "event=session_end module=session status=ok revision={}",
            self.view.snapshot().revision
        );
    }

    /// Latest snapshot after applying everything already delivered, including
    /// this session's own writes.
    fn catch_up(&mut self) -> Arc<Snapshot> {
        self.view.sync_pending();
        self.view.snapshot()
    }
}
