//! Typed, order-preserving repositories mirrored into a durable store.
//! This crate owns the consistency rules between the memory cache and storage.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sync;

pub use db::{
    DatabaseContext, DatabaseDriver, DatabaseModel, DbError, DbResult, SqliteDriver, SqliteModel,
};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::agent::{Agent, AgentId, AgentStatus};
pub use model::push_credentials::{
    PushCredentials, PushCredentialsChange, PushCredentialsRecord, PushCredentialsRecordStatus,
    PushSubscriptionStatus,
};
pub use repo::agent_repo::{channel_agents_repository, chat_agents_repository, AgentRepository};
pub use repo::diagnostics::{LogDiagnostics, RepositoryDiagnostics, RepositoryEvent};
pub use repo::memory_repo::MemoryRepository;
pub use repo::persistent_repo::{ModelTranslations, PersistentRepository};
pub use repo::push_credentials_repo::{push_credentials_repository, PushCredentialsRepository};
pub use repo::repository::{Repository, RepositoryPolicies};
pub use sync::semaphore::CountingSemaphore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
