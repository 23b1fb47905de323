//! Persistent repository of device push credentials.
//!
//! # Responsibility
//! - Wire `PushCredentials` items to `push_credentials` records.
//!
//! # Invariants
//! - Index and store primary key are the same `channel:client:device` string.

use crate::db::{DatabaseDriver, DbResult};
use crate::model::push_credentials::{PushCredentials, PushCredentialsChange, PushCredentialsRecord};
use crate::repo::memory_repo::MemoryRepository;
use crate::repo::persistent_repo::{ModelTranslations, PersistentRepository};
use crate::repo::repository::RepositoryPolicies;
use std::sync::Arc;

pub type PushCredentialsRepository<D> =
    PersistentRepository<String, PushCredentials, PushCredentialsRecord, D>;

/// Builds the push credentials repository and reconciles it with `driver`.
///
/// `update_handler` receives the reconciled credentials once, then every
/// changed batch.
pub fn push_credentials_repository<D>(
    driver: Arc<D>,
    update_handler: impl Fn(&[PushCredentials]) + Send + Sync + 'static,
) -> DbResult<PushCredentialsRepository<D>>
where
    D: DatabaseDriver<PushCredentialsRecord>,
{
    let policies = RepositoryPolicies::new(PushCredentials::id)
        .with_update_detection(|old: &PushCredentials, new: &PushCredentials| old != new)
        .with_update_handler(update_handler);

    PersistentRepository::try_new(
        MemoryRepository::new(policies),
        driver,
        ModelTranslations::new(
            |item: &PushCredentials| PushCredentialsChange::from(item),
            |record: &PushCredentialsRecord| PushCredentials::from(record),
            String::clone,
        ),
    )
}
