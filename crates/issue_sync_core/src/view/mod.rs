//! Client-side live views over store subscriptions.
//!
//! # Responsibility
//! - Hold the authoritative snapshot for one client.
//! - Derive and publish filtered projections for presentation layers.

pub mod live_view;
