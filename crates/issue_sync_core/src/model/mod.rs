//! Issue domain model.
//!
//! # Responsibility
//! - Define the canonical issue record, draft and filter shapes.
//! - Keep the record statically typed so every read is validated once.
//!
//! # Invariants
//! - Every issue is identified by a store-assigned `IssueId`.
//! - Issues are never deleted; only `status` and `updated_at` change.

pub mod filter;
pub mod identity;
pub mod issue;
