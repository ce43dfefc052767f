//! Pure business rules applied before any store write.
//!
//! # Responsibility
//! - Enforce the issue status state machine.
//! - Compute the advisory duplicate-title signal.
//!
//! # Invariants
//! - Rules never touch storage and never block on I/O.

pub mod duplicate;
pub mod transition;
