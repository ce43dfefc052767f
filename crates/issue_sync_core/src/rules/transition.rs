//! Issue status state machine.
//!
//! # Invariants
//! - `Open -> Done` is the only forbidden edge.
//! - Every other pair, including no-op self transitions, is allowed.

use crate::model::issue::IssueStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A status change that violates the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRejected {
    pub current: IssueStatus,
    pub target: IssueStatus,
}

impl Display for TransitionRejected {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot move directly from {} to {}; set it to {} first",
            self.current,
            self.target,
            IssueStatus::InProgress
        )
    }
}

impl Error for TransitionRejected {}

/// Returns whether `current -> target` is an allowed status change.
pub fn is_valid_transition(current: IssueStatus, target: IssueStatus) -> bool {
    !matches!((current, target), (IssueStatus::Open, IssueStatus::Done))
}

/// Same as [`is_valid_transition`], carrying the rejected pair on failure.
pub fn check_transition(
    current: IssueStatus,
    target: IssueStatus,
) -> Result<(), TransitionRejected> {
    if is_valid_transition(current, target) {
        Ok(())
    } else {
        Err(TransitionRejected { current, target })
    }
}
