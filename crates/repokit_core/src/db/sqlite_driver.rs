//! SQLite implementation of the durable store contract.
//!
//! # Responsibility
//! - Serialize access to one migrated SQLite connection.
//! - Run read-write units of work inside IMMEDIATE transactions.
//! - Delegate per-table SQL to `SqliteModel` implementations.
//!
//! # Invariants
//! - A failed unit of work is rolled back before the error is returned.
//! - The connection lock is held for the whole transaction, never longer.

use super::driver::{DatabaseContext, DatabaseDriver, DatabaseModel};
use super::open::{open_db, open_db_in_memory};
use super::DbResult;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

/// Table mapping for a model stored in SQLite.
pub trait SqliteModel: DatabaseModel + Sized {
    /// Table name used in log events.
    const TABLE: &'static str;

    /// Loads every row in insertion order.
    fn load_all(conn: &Connection) -> DbResult<Vec<Self>>;

    /// Writes one change and returns the row as stored.
    ///
    /// Returns `Ok(None)` when the change is skipped.
    fn upsert_change(conn: &Connection, change: &Self::Change) -> DbResult<Option<Self>>;

    /// Loads one row by primary key.
    fn find(conn: &Connection, key: &Self::MainKey) -> DbResult<Option<Self>>;

    /// Deletes one row. Returns `false` when no row matched.
    fn delete(conn: &Connection, object: &Self) -> DbResult<bool>;

    /// Deletes every row and returns the number removed.
    fn delete_all(conn: &Connection) -> DbResult<usize>;
}

/// Durable store backed by a single SQLite connection.
pub struct SqliteDriver {
    conn: Mutex<Connection>,
}

impl SqliteDriver {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Runs `f` against the underlying connection outside any transaction.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let conn = self.conn.lock();
        f(&conn)
    }
}

struct SqliteContext<'a, M> {
    conn: &'a Connection,
    _model: PhantomData<fn() -> M>,
}

impl<M: SqliteModel> DatabaseContext<M> for SqliteContext<'_, M> {
    fn upsert(&mut self, changes: &[M::Change]) -> DbResult<Vec<M>> {
        let mut models = Vec::with_capacity(changes.len());
        for change in changes {
            match M::upsert_change(self.conn, change)? {
                Some(model) => models.push(model),
                None => debug!(
                    "event=db_upsert module=db status=skipped table={}",
                    M::TABLE
                ),
            }
        }
        Ok(models)
    }

    fn object(&mut self, key: &M::MainKey) -> DbResult<Option<M>> {
        M::find(self.conn, key)
    }

    fn simple_remove(&mut self, objects: &[M]) -> DbResult<bool> {
        let mut removed_all = true;
        for object in objects {
            removed_all &= M::delete(self.conn, object)?;
        }
        Ok(removed_all)
    }

    fn remove_all(&mut self) -> DbResult<bool> {
        let removed = M::delete_all(self.conn)?;
        debug!(
            "event=db_remove_all module=db status=ok table={} rows={}",
            M::TABLE,
            removed
        );
        Ok(true)
    }
}

impl<M: SqliteModel> DatabaseDriver<M> for SqliteDriver {
    fn objects(&self) -> DbResult<Vec<M>> {
        let conn = self.conn.lock();
        M::load_all(&conn)
    }

    fn readwrite<R, F>(&self, transaction: F) -> DbResult<R>
    where
        F: FnOnce(&mut dyn DatabaseContext<M>) -> DbResult<R>,
    {
        let started_at = Instant::now();
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = {
            let mut context = SqliteContext::<M> {
                conn: &tx,
                _model: PhantomData,
            };
            transaction(&mut context)
        };

        match outcome {
            Ok(value) => {
                tx.commit()?;
                debug!(
                    "event=db_readwrite module=db status=ok table={} duration_ms={}",
                    M::TABLE,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                // Dropping the transaction rolls it back.
                drop(tx);
                warn!(
                    "event=db_readwrite module=db status=error table={} duration_ms={} error={}",
                    M::TABLE,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}
