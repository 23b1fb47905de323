//! Mutex-guarded, insertion-ordered in-memory repository.
//!
//! # Responsibility
//! - Keep an `index -> item` map together with the first-insertion order of
//!   its keys.
//! - Detect semantic changes on upsert through the injected policy.
//!
//! # Invariants
//! - The order list holds exactly the map's key set, each key once.
//! - Per-entry mutation goes through `IndexedItems::upsert_indexed`, which
//!   updates the map and the order list in one critical section.
//! - The lock is never held while a policy, handler or completion runs.

use crate::repo::diagnostics::RepositoryEvent;
use crate::repo::repository::{Repository, RepositoryPolicies};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

struct IndexedItems<I, T> {
    items: HashMap<I, T>,
    order: Vec<I>,
}

impl<I: Eq + Hash + Clone, T> IndexedItems<I, T> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Inserts, replaces (`Some`) or removes (`None`) the entry at `index`.
    ///
    /// Returns the entry previously stored there. A replaced entry keeps its
    /// position; a removed one is compacted out of the order list.
    fn upsert_indexed(&mut self, index: I, item: Option<T>) -> Option<T> {
        match item {
            Some(item) => {
                let previous = self.items.insert(index.clone(), item);
                if previous.is_none() && !self.order.contains(&index) {
                    self.order.push(index);
                }
                previous
            }
            None => {
                let previous = self.items.remove(&index);
                self.order.retain(|entry| entry != &index);
                previous
            }
        }
    }

    fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        self.order.clear();
        removed
    }
}

/// Thread-safe repository living entirely in memory.
pub struct MemoryRepository<I, T> {
    state: Mutex<IndexedItems<I, T>>,
    policies: RepositoryPolicies<I, T>,
}

impl<I, T> MemoryRepository<I, T>
where
    I: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new(policies: RepositoryPolicies<I, T>) -> Self {
        Self {
            state: Mutex::new(IndexedItems::new()),
            policies,
        }
    }

    /// Creates a repository pre-filled with `items`.
    ///
    /// Items sharing an index collapse to the last one, placed where the
    /// first one appeared. The update handler is not invoked.
    pub fn with_items(items: impl IntoIterator<Item = T>, policies: RepositoryPolicies<I, T>) -> Self {
        let repository = Self::new(policies);
        repository.upsert_silently(items);
        repository
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live items in order, skipping and reporting dangling order entries.
    pub(crate) fn snapshot(&self) -> Vec<T> {
        let entries: Vec<Option<T>> = {
            let state = self.state.lock();
            state
                .order
                .iter()
                .map(|index| state.items.get(index).cloned())
                .collect()
        };

        let missing = entries.iter().filter(|entry| entry.is_none()).count();
        if missing > 0 {
            self.policies
                .diagnostics()
                .report(RepositoryEvent::DanglingOrderEntries { missing });
        }

        entries.into_iter().flatten().collect()
    }

    pub(crate) fn get(&self, index: &I) -> Option<T> {
        self.state.lock().items.get(index).cloned()
    }

    /// Applies `items` and returns the changed subset without notifying.
    pub(crate) fn upsert_silently(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let indexed: Vec<(I, T)> = items
            .into_iter()
            .map(|item| (self.policies.index_of(&item), item))
            .collect();

        let replaced: Vec<(Option<T>, T)> = {
            let mut state = self.state.lock();
            indexed
                .into_iter()
                .map(|(index, item)| (state.upsert_indexed(index, Some(item.clone())), item))
                .collect()
        };

        replaced
            .into_iter()
            .filter_map(|(previous, item)| match previous {
                Some(previous) if !self.policies.was_updated(&previous, &item) => None,
                _ => Some(item),
            })
            .collect()
    }

    pub(crate) fn remove(&self, index: &I) -> Option<T> {
        self.state.lock().upsert_indexed(index.clone(), None)
    }

    /// Empties the repository and returns how many items it held.
    pub(crate) fn clear(&self) -> usize {
        self.state.lock().clear()
    }
}

impl<I, T> Repository<I, T> for MemoryRepository<I, T>
where
    I: Eq + Hash + Clone,
    T: Clone,
{
    fn policies(&self) -> &RepositoryPolicies<I, T> {
        &self.policies
    }

    fn all_items<F>(&self, completion: F)
    where
        F: FnOnce(Vec<T>),
    {
        completion(self.snapshot());
    }

    fn item_by<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(Option<T>),
    {
        completion(self.get(index));
    }

    fn upsert<It, F>(&self, items: It, completion: F)
    where
        It: IntoIterator<Item = T>,
        F: FnOnce(Vec<T>),
    {
        let updated = self.upsert_silently(items);
        if !updated.is_empty() {
            self.policies.notify(&updated);
        }
        completion(updated);
    }

    fn remove_item<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(bool),
    {
        self.remove(index);
        completion(true);
    }

    /// Always completes `true`; inspect `is_empty` beforehand to learn
    /// whether anything was removed.
    fn remove_all<F>(&self, completion: F)
    where
        F: FnOnce(bool),
    {
        self.clear();
        completion(true);
    }
}
