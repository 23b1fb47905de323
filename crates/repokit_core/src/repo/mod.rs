//! Repository contract, generic implementations and entity repositories.
//!
//! # Responsibility
//! - Define the completion-based repository contract.
//! - Provide the in-memory and store-mirrored implementations.
//! - Instantiate them for concrete entities.
//!
//! # Invariants
//! - Memory caches preserve first-insertion order of live items.
//! - Persistent caches never show a write the store did not commit.

pub mod agent_repo;
pub mod diagnostics;
pub mod memory_repo;
pub mod persistent_repo;
pub mod push_credentials_repo;
pub mod repository;
