//! Memory repository mirrored into a durable store.
//!
//! # Responsibility
//! - Reconcile the memory cache with the durable store once, at construction.
//! - Route writes through a durable transaction and mirror only what the
//!   store committed back into memory.
//!
//! # Invariants
//! - The cache is replaced, never merged, during reconciliation.
//! - Upserted items become visible only after the store committed them.
//! - Removed items disappear from the cache before the durable removal runs.
//! - The semaphore guards memory-side work only; it is never held across a
//!   durable transaction or a completion.

use crate::db::{DatabaseDriver, DatabaseModel, DbResult};
use crate::repo::diagnostics::RepositoryEvent;
use crate::repo::memory_repo::MemoryRepository;
use crate::repo::repository::{Repository, RepositoryPolicies};
use crate::sync::semaphore::CountingSemaphore;
use log::{debug, error, info};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

/// Conversions between repository items and store records.
pub struct ModelTranslations<I, T, M: DatabaseModel> {
    change_from_item: Arc<dyn Fn(&T) -> M::Change + Send + Sync>,
    item_from_model: Arc<dyn Fn(&M) -> T + Send + Sync>,
    main_key_from_index: Arc<dyn Fn(&I) -> M::MainKey + Send + Sync>,
}

impl<I, T, M: DatabaseModel> ModelTranslations<I, T, M> {
    pub fn new(
        change_from_item: impl Fn(&T) -> M::Change + Send + Sync + 'static,
        item_from_model: impl Fn(&M) -> T + Send + Sync + 'static,
        main_key_from_index: impl Fn(&I) -> M::MainKey + Send + Sync + 'static,
    ) -> Self {
        Self {
            change_from_item: Arc::new(change_from_item),
            item_from_model: Arc::new(item_from_model),
            main_key_from_index: Arc::new(main_key_from_index),
        }
    }
}

/// Repository whose memory cache mirrors a durable store.
pub struct PersistentRepository<I, T, M: DatabaseModel, D> {
    semaphore: CountingSemaphore,
    memory: MemoryRepository<I, T>,
    driver: Arc<D>,
    translations: ModelTranslations<I, T, M>,
}

impl<I, T, M, D> PersistentRepository<I, T, M, D>
where
    I: Eq + Hash + Clone,
    T: Clone,
    M: DatabaseModel,
    D: DatabaseDriver<M>,
{
    /// Builds the repository and reconciles `memory` with the store.
    ///
    /// Whatever `memory` held before is discarded. The update handler is
    /// invoked once with the reconciled items before this returns.
    ///
    /// # Errors
    /// - Returns the store error when the initial read fails.
    pub fn try_new(
        memory: MemoryRepository<I, T>,
        driver: Arc<D>,
        translations: ModelTranslations<I, T, M>,
    ) -> DbResult<Self> {
        let repository = Self {
            semaphore: CountingSemaphore::new(1),
            memory,
            driver,
            translations,
        };
        repository.reconcile()?;
        Ok(repository)
    }

    fn reconcile(&self) -> DbResult<()> {
        let started_at = Instant::now();
        let models = self.driver.objects().inspect_err(|err| {
            error!(
                "event=repo_reconcile module=repo status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
        })?;
        let items: Vec<T> = models
            .iter()
            .map(|model| (self.translations.item_from_model)(model))
            .collect();

        let (discarded, inserted) = {
            let _permit = self.semaphore.acquire();
            let discarded = self.memory.clear();
            (discarded, self.memory.upsert_silently(items))
        };

        if discarded > 0 {
            self.policies()
                .diagnostics()
                .report(RepositoryEvent::StaleCacheDiscarded { discarded });
        }

        info!(
            "event=repo_reconcile module=repo status=ok items={} duration_ms={}",
            inserted.len(),
            started_at.elapsed().as_millis()
        );
        self.policies().notify(&inserted);
        Ok(())
    }
}

impl<I, T, M, D> Repository<I, T> for PersistentRepository<I, T, M, D>
where
    I: Eq + Hash + Clone,
    T: Clone,
    M: DatabaseModel,
    D: DatabaseDriver<M>,
{
    fn policies(&self) -> &RepositoryPolicies<I, T> {
        self.memory.policies()
    }

    fn all_items<F>(&self, completion: F)
    where
        F: FnOnce(Vec<T>),
    {
        let items = {
            let _permit = self.semaphore.acquire();
            self.memory.snapshot()
        };
        completion(items);
    }

    fn item_by<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(Option<T>),
    {
        let item = {
            let _permit = self.semaphore.acquire();
            self.memory.get(index)
        };
        completion(item);
    }

    /// Completes with the changed subset of what the store persisted.
    ///
    /// A failed transaction leaves the cache untouched and completes with no
    /// items. Changes the store skipped are not mirrored.
    fn upsert<It, F>(&self, items: It, completion: F)
    where
        It: IntoIterator<Item = T>,
        F: FnOnce(Vec<T>),
    {
        let changes: Vec<M::Change> = items
            .into_iter()
            .map(|item| (self.translations.change_from_item)(&item))
            .collect();

        let stored = self.driver.readwrite(|context| {
            let models = context.upsert(&changes)?;
            Ok(models
                .iter()
                .map(|model| (self.translations.item_from_model)(model))
                .collect::<Vec<T>>())
        });

        let stored = match stored {
            Ok(stored) => stored,
            Err(err) => {
                error!(
                    "event=repo_upsert module=repo status=error changes={} error={}",
                    changes.len(),
                    err
                );
                completion(Vec::new());
                return;
            }
        };

        if stored.len() < changes.len() {
            debug!(
                "event=repo_upsert module=repo status=partial changes={} stored={}",
                changes.len(),
                stored.len()
            );
        }

        let updated = {
            let _permit = self.semaphore.acquire();
            self.memory.upsert_silently(stored)
        };
        if !updated.is_empty() {
            self.policies().notify(&updated);
        }
        completion(updated);
    }

    /// Drops the cached item first, then completes with the durable result.
    fn remove_item<F>(&self, index: &I, completion: F)
    where
        F: FnOnce(bool),
    {
        {
            let _permit = self.semaphore.acquire();
            self.memory.remove(index);
        }

        let main_key = (self.translations.main_key_from_index)(index);
        let removed = self.driver.readwrite(|context| {
            let models: Vec<M> = context.object(&main_key)?.into_iter().collect();
            context.simple_remove(&models)
        });

        let succeeded = removed.unwrap_or_else(|err| {
            error!("event=repo_remove module=repo status=error error={err}");
            false
        });
        completion(succeeded);
    }

    /// Clears the cache only after the store confirmed the removal.
    fn remove_all<F>(&self, completion: F)
    where
        F: FnOnce(bool),
    {
        let removed = self
            .driver
            .readwrite(|context| context.remove_all())
            .unwrap_or_else(|err| {
                error!("event=repo_remove_all module=repo status=error error={err}");
                false
            });

        if removed {
            let _permit = self.semaphore.acquire();
            self.memory.clear();
        }
        completion(removed);
    }
}
