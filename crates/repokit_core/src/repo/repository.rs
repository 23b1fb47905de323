//! Repository contract shared by in-memory and persistent caches.
//!
//! # Responsibility
//! - Define the completion-based operation surface every repository exposes.
//! - Bundle the injected policies (indexing, change detection, notification,
//!   diagnostics) so wrappers can forward them unchanged.
//!
//! # Invariants
//! - Every completion is invoked exactly once per call.
//! - Completions run after internal locks are released.

use crate::repo::diagnostics::{LogDiagnostics, RepositoryDiagnostics};
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::sync::Arc;

/// Derives the unique index of an item.
pub type ItemIndexFn<I, T> = Arc<dyn Fn(&T) -> I + Send + Sync>;
/// Decides whether replacing `old` with `new` is a semantic change.
pub type WasItemUpdatedFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;
/// Receives the items that changed after a mutation.
pub type UpdateHandler<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Policies injected into a repository at construction.
pub struct RepositoryPolicies<I, T> {
    item_index: ItemIndexFn<I, T>,
    was_item_updated: WasItemUpdatedFn<T>,
    update_handler: UpdateHandler<T>,
    diagnostics: Arc<dyn RepositoryDiagnostics>,
}

impl<I: 'static, T: 'static> RepositoryPolicies<I, T> {
    /// Creates policies that index items with `item_index`.
    ///
    /// Every replacement counts as an update and notifications are dropped
    /// until configured otherwise.
    pub fn new(item_index: impl Fn(&T) -> I + Send + Sync + 'static) -> Self {
        Self {
            item_index: Arc::new(item_index),
            was_item_updated: Arc::new(|_: &T, _: &T| true),
            update_handler: Arc::new(|_: &[T]| {}),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_update_detection(
        mut self,
        was_item_updated: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.was_item_updated = Arc::new(was_item_updated);
        self
    }

    pub fn with_update_handler(mut self, handler: impl Fn(&[T]) + Send + Sync + 'static) -> Self {
        self.update_handler = Arc::new(handler);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn RepositoryDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl<I, T> RepositoryPolicies<I, T> {
    pub fn index_of(&self, item: &T) -> I {
        (self.item_index)(item)
    }

    pub fn was_updated(&self, old: &T, new: &T) -> bool {
        (self.was_item_updated)(old, new)
    }

    /// Forwards `items` to the update handler.
    pub fn notify(&self, items: &[T]) {
        (self.update_handler)(items)
    }

    pub fn diagnostics(&self) -> &dyn RepositoryDiagnostics {
        self.diagnostics.as_ref()
    }
}

impl<I, T> Clone for RepositoryPolicies<I, T> {
    fn clone(&self) -> Self {
        Self {
            item_index: Arc::clone(&self.item_index),
            was_item_updated: Arc::clone(&self.was_item_updated),
            update_handler: Arc::clone(&self.update_handler),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

impl<I, T> Debug for RepositoryPolicies<I, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryPolicies").finish_non_exhaustive()
    }
}

/// Typed, order-preserving item cache keyed by `I`.
///
/// Implementations decide whether completions run synchronously; callers must
/// only rely on each completion running exactly once.
pub trait Repository<I, T>
where
    I: Eq + Hash + Clone,
    T: Clone,
{
    /// Policies this repository was built with.
    fn policies(&self) -> &RepositoryPolicies<I, T>;

    /// Completes with every live item in first-insertion order.
    fn all_items<F>(&self, completion: F)
    where
        F: FnOnce(Vec<T>);

    /// Completes with the item stored under `index`, if any.
    fn item_by<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(Option<T>);

    /// Inserts new items and replaces existing ones.
    ///
    /// Completes with the subset judged changed by the update-detection
    /// policy, in input order. New items always count as changed.
    fn upsert<It, F>(&self, items: It, completion: F)
    where
        It: IntoIterator<Item = T>,
        F: FnOnce(Vec<T>);

    /// Removes the item stored under `index`.
    fn remove_item<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(bool);

    /// Removes every item.
    fn remove_all<F>(&self, completion: F)
    where
        F: FnOnce(bool);
}
