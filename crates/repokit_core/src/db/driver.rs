//! Storage-engine agnostic durable store contract.
//!
//! # Responsibility
//! - Describe the only store operations repositories depend on: a bulk read
//!   and a read-write unit of work.
//!
//! # Invariants
//! - `readwrite` commits when the closure returns `Ok` and rolls back on `Err`.
//! - Models returned from `DatabaseContext::upsert` reflect what the store
//!   actually persisted, including store-assigned fields.

use super::DbResult;

/// A store-native record type.
pub trait DatabaseModel {
    /// Caller-defined write intent turned into a record by the store.
    type Change;
    /// Store primary key used to locate one record.
    type MainKey;
}

/// Operations available inside one read-write transaction.
pub trait DatabaseContext<M: DatabaseModel> {
    /// Creates or replaces one record per change and returns the stored records.
    ///
    /// Changes the store cannot apply are skipped, so the output may be shorter
    /// than the input.
    fn upsert(&mut self, changes: &[M::Change]) -> DbResult<Vec<M>>;

    /// Finds one record by primary key.
    fn object(&mut self, key: &M::MainKey) -> DbResult<Option<M>>;

    /// Removes the given records. Returns `true` when every record was removed.
    fn simple_remove(&mut self, objects: &[M]) -> DbResult<bool>;

    /// Removes every record of this model type.
    fn remove_all(&mut self) -> DbResult<bool>;
}

/// Durable store handle shared by persistent repositories.
pub trait DatabaseDriver<M: DatabaseModel>: Send + Sync {
    /// Reads every record of the model type, unfiltered.
    fn objects(&self) -> DbResult<Vec<M>>;

    /// Runs `transaction` as one atomic unit of work.
    fn readwrite<R, F>(&self, transaction: F) -> DbResult<R>
    where
        F: FnOnce(&mut dyn DatabaseContext<M>) -> DbResult<R>;
}
