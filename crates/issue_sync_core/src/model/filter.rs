//! Client-local filter state over issue snapshots.
//!
//! # Invariants
//! - Filtering never reorders; output order is the input order.
//! - Status and priority predicates are independent and both must pass.

use crate::model::issue::{Issue, IssuePriority, IssueStatus};
use serde::{Deserialize, Serialize};

/// Status predicate of a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Only(IssueStatus),
}

impl StatusFilter {
    pub fn matches(self, status: IssueStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == status,
        }
    }

    /// Parses `All` or a status label.
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        IssueStatus::parse_label(value).map(Self::Only)
    }
}

/// Priority predicate of a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(IssuePriority),
}

impl PriorityFilter {
    pub fn matches(self, priority: IssuePriority) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == priority,
        }
    }

    /// Parses `All` or a priority label.
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        IssuePriority::parse_label(value).map(Self::Only)
    }
}

/// Combined filter state owned by a live view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueFilter {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
}

impl IssueFilter {
    pub fn new(status: StatusFilter, priority: PriorityFilter) -> Self {
        Self { status, priority }
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        self.status.matches(issue.status) && self.priority.matches(issue.priority)
    }

    /// Returns the matching issues in input order.
    pub fn apply(&self, issues: &[Issue]) -> Vec<Issue> {
        issues
            .iter()
            .filter(|issue| self.matches(issue))
            .cloned()
            .collect()
    }
}
