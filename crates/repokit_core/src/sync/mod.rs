//! Concurrency primitives shared by repository implementations.
//!
//! # Responsibility
//! - Provide blocking primitives that are not tied to a lexical lock scope.

pub mod semaphore;
