//! Database layer for the clinic core.
//!
//! Every read and write takes a [`TenantContext`](crate::context::TenantContext)
//! and filters on its `clinic_id`. Rows belonging to another clinic are
//! reported as not found.

mod appointments;
mod billing;
mod inventory;
mod patients;
mod records;
mod schema;
mod showcase;
mod team;

pub use schema::*;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::billing::round_money;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Record belongs to another clinic: {0}")]
    TenantMismatch(String),

    #[error("Concurrent modification of {0}; reload and retry")]
    Conflict(String),

    #[error("Invalid stored value for {column}: {value:?}")]
    InvalidValue { column: &'static str, value: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Default wait for a contended write lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open database at path with a custom busy timeout.
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction on this connection.
    ///
    /// The write lock is taken before `f` reads anything; writers on other
    /// connections wait up to the busy timeout. Any error rolls back.
    pub(crate) fn immediate<T>(&self, f: impl FnOnce() -> DbResult<T>) -> DbResult<T> {
        let tx = rusqlite::Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }
}

/// Money as stored: decimal string rounded to cents.
pub(crate) fn money_to_sql(value: Decimal) -> String {
    round_money(value).to_string()
}

pub(crate) fn money_from_sql(column: &'static str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

/// Parse a closed enum stored as text.
pub(crate) fn enum_from_sql<T>(column: &'static str, value: &str, parse: fn(&str) -> Option<T>) -> DbResult<T> {
    parse(value).ok_or_else(|| DbError::InvalidValue {
        column,
        value: value.to_string(),
    })
}
