//! Issue domain model.
//!
//! # Responsibility
//! - Define the canonical issue record shared by store, view and gateway.
//! - Define the caller-supplied draft used by create intents.
//!
//! # Invariants
//! - `id`, `created_by` and `created_at` never change after creation.
//! - `created_at <= updated_at`.
//! - `title` is never blank.
//! - Timestamps are assigned by the store, never by a client.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned identifier for every issue.
pub type IssueId = Uuid;

/// Server-assigned time in Unix epoch milliseconds.
pub type Timestamp = i64;

/// Workflow state of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Reported, nobody has picked it up yet.
    #[default]
    Open,
    /// Acknowledged and being worked on.
    InProgress,
    /// Closed.
    Done,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [Self::Open, Self::InProgress, Self::Done];

    /// Human-readable label used by presentation layers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Parses a display label, case-insensitively.
    ///
    /// Accepts `In Progress`, `in_progress` and `inprogress` for the middle
    /// state.
    pub fn parse_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in progress" | "in_progress" | "inprogress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl Display for IssueStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Urgency of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl IssuePriority {
    pub const ALL: [IssuePriority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Display for IssuePriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Boundary validation failures for issue records and drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueValidationError {
    /// Title is empty or whitespace only.
    EmptyTitle,
    /// Creator/session identity is empty or whitespace only.
    EmptyIdentity,
    /// `updated_at` precedes `created_at`.
    TimestampOrder {
        created_at: Timestamp,
        updated_at: Timestamp,
    },
}

impl Display for IssueValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "issue title cannot be empty"),
            Self::EmptyIdentity => write!(f, "identity cannot be empty"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for IssueValidationError {}

/// Canonical issue record as observed in a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    /// May be empty.
    pub description: String,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    /// `None` means unassigned.
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Issue {
    /// Checks record-level invariants.
    ///
    /// Used by the store read path to quarantine rows that do not form a
    /// valid issue.
    pub fn validate(&self) -> Result<(), IssueValidationError> {
        if self.title.trim().is_empty() {
            return Err(IssueValidationError::EmptyTitle);
        }
        if self.created_by.trim().is_empty() {
            return Err(IssueValidationError::EmptyIdentity);
        }
        if self.updated_at < self.created_at {
            return Err(IssueValidationError::TimestampOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Caller-supplied fields of a create intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub priority: IssuePriority,
    pub assigned_to: Option<String>,
}

impl IssueDraft {
    /// Creates a draft with empty description, `Medium` priority and no
    /// assignee.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: IssuePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    /// Rejects drafts the store must never see.
    pub fn validate(&self) -> Result<(), IssueValidationError> {
        if self.title.trim().is_empty() {
            return Err(IssueValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Fully resolved create request handed to a store.
///
/// Carries no id, status or timestamps: the store assigns all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub priority: IssuePriority,
    pub assigned_to: Option<String>,
    pub created_by: String,
}

impl NewIssue {
    /// Binds a draft to the creating identity.
    ///
    /// A blank assignee becomes `None`.
    pub fn from_draft(draft: &IssueDraft, created_by: impl Into<String>) -> Self {
        let assigned_to = draft
            .assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            assigned_to,
            created_by: created_by.into(),
        }
    }
}
