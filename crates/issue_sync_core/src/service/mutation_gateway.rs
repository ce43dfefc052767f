//! Mutation gateway: the only write path into an issue store.
//!
//! # Responsibility
//! - Validate create intents and attach the advisory duplicate signal.
//! - Enforce the status state machine before any status write.
//! - Forward accepted intents to the store and surface its errors unchanged.
//!
//! # Invariants
//! - A rejected transition or invalid draft never reaches the store.
//! - Duplicate matches never block creation.
//! - No retries: every failure is returned to the caller immediately.

use crate::model::identity::Identity;
use crate::model::issue::{
    Issue, IssueDraft, IssueId, IssueStatus, IssueValidationError, NewIssue,
};
use crate::rules::duplicate::DuplicateSignal;
use crate::rules::transition::{check_transition, TransitionRejected};
use crate::store::{IssueStore, PersistenceError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Terminal failure of one mutation intent.
#[derive(Debug)]
pub enum MutationError {
    /// Required field missing at the boundary.
    Validation(IssueValidationError),
    /// Status change violates the state machine; store was not contacted.
    TransitionRejected(TransitionRejected),
    /// Store rejected or failed the write.
    Persistence(PersistenceError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TransitionRejected(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::TransitionRejected(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<IssueValidationError> for MutationError {
    fn from(value: IssueValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransitionRejected> for MutationError {
    fn from(value: TransitionRejected) -> Self {
        Self::TransitionRejected(value)
    }
}

impl From<PersistenceError> for MutationError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Result of an accepted create intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    /// Store-assigned id.
    pub id: IssueId,
    /// Existing issues that looked similar when the intent was accepted.
    pub duplicates: DuplicateSignal,
}

/// Write path for one authenticated identity.
pub struct MutationGateway<S: IssueStore> {
    store: S,
    identity: Identity,
}

impl<S: IssueStore> MutationGateway<S> {
    pub fn new(store: S, identity: Identity) -> Self {
        Self { store, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Duplicate signal for a title being typed; creates nothing.
    pub fn check_duplicates(&self, title: &str, known: &[Issue]) -> DuplicateSignal {
        DuplicateSignal::detect(title, known)
    }

    /// Creates an issue from `draft` as the gateway identity.
    ///
    /// # Contract
    /// - Blank titles fail with `MutationError::Validation` before any I/O.
    /// - `known` is only used for the advisory duplicate signal.
    /// - Store failures are returned as `MutationError::Persistence` unchanged.
    pub fn create_issue(
        &self,
        draft: &IssueDraft,
        known: &[Issue],
    ) -> Result<CreatedIssue, MutationError> {
        draft.validate()?;

        let duplicates = DuplicateSignal::detect(&draft.title, known);
        if !duplicates.is_empty() {
            warn!(
                "event=issue_create module=gateway status=duplicate_signal matches={}",
                duplicates.len()
            );
        }

        let new_issue = NewIssue::from_draft(draft, self.identity.as_str());
        let id = self.store.create(&new_issue).map_err(|err| {
            error!("event=issue_create module=gateway status=error error={err}");
            MutationError::from(err)
        })?;

        info!("event=issue_create module=gateway status=ok issue_id={id}");
        Ok(CreatedIssue { id, duplicates })
    }

    /// Moves `issue` to `target` if the state machine allows it.
    ///
    /// `issue.status` is taken as the current status; the gateway does not
    /// re-read it from the store.
    pub fn update_status(&self, issue: &Issue, target: IssueStatus) -> Result<(), MutationError> {
        if let Err(rejected) = check_transition(issue.status, target) {
            warn!(
                "event=issue_update_status module=gateway status=rejected issue_id={} current={:?} target={:?}",
                issue.id, rejected.current, rejected.target
            );
            return Err(rejected.into());
        }

        self.store.update_status(issue.id, target).map_err(|err| {
            error!(
                "event=issue_update_status module=gateway status=error issue_id={} error={}",
                issue.id, err
            );
            MutationError::from(err)
        })?;

        info!(
            "event=issue_update_status module=gateway status=ok issue_id={} target={:?}",
            issue.id, target
        );
        Ok(())
    }
}
