//! Core use-case services.
//!
//! # Responsibility
//! - Turn presentation-layer intents into validated store writes.
//! - Keep presentation code decoupled from store details.

pub mod mutation_gateway;
