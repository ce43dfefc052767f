//! Live synchronization and consistency core for a shared issue tracker.
//! This crate is the single source of truth for issue invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod rules;
pub mod service;
pub mod session;
pub mod store;
pub mod view;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::filter::{IssueFilter, PriorityFilter, StatusFilter};
pub use model::identity::Identity;
pub use model::issue::{
    Issue, IssueDraft, IssueId, IssuePriority, IssueStatus, IssueValidationError, NewIssue,
    Timestamp,
};
pub use rules::duplicate::{find_similar, DuplicateSignal, DUPLICATE_PREVIEW_LIMIT};
pub use rules::transition::{check_transition, is_valid_transition, TransitionRejected};
pub use service::mutation_gateway::{CreatedIssue, MutationError, MutationGateway};
pub use session::Session;
pub use store::{
    IssueStore, PersistenceError, PersistenceResult, Snapshot, SqliteIssueStore, Subscription,
    SubscriptionEvent,
};
pub use view::live_view::{LiveViewController, Projection, ViewUpdate};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
