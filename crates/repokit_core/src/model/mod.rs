//! Entity models cached by the concrete repositories.
//!
//! # Responsibility
//! - Define the item types repositories hand to callers.
//! - Define store-side change/record types and their translations.
//!
//! # Invariants
//! - Items never carry store-assigned bookkeeping fields.

pub mod agent;
pub mod push_credentials;
