//! Injected diagnostics for repository representation problems.
//!
//! # Responsibility
//! - Report integrity findings without turning them into caller errors.
//!
//! # Invariants
//! - Reporting never fails and never panics.

use log::warn;

/// Integrity finding raised by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// The order list referenced indices with no stored item.
    DanglingOrderEntries { missing: usize },
    /// A persistent repository found a populated cache before its first
    /// reconciliation and discarded it.
    StaleCacheDiscarded { discarded: usize },
}

/// Receiver of repository diagnostics.
pub trait RepositoryDiagnostics: Send + Sync {
    fn report(&self, event: RepositoryEvent);
}

/// Default sink writing warnings through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl RepositoryDiagnostics for LogDiagnostics {
    fn report(&self, event: RepositoryEvent) {
        match event {
            RepositoryEvent::DanglingOrderEntries { missing } => warn!(
                "event=repo_order_dangling module=repo status=warn missing={missing}"
            ),
            RepositoryEvent::StaleCacheDiscarded { discarded } => warn!(
                "event=repo_reconcile_stale_cache module=repo status=warn discarded={discarded}"
            ),
        }
    }
}
