//! Relational store access.
//!
//! Ingestion only needs a narrow capability from the database: open a session, ask whether a
//! table exists, and execute parameterized statements. [`RelationalStore`] is constructed once per
//! process and shared by reference; each ingestion run opens its own [`StoreSession`] and drops it
//! when the run ends, which releases the underlying connection on every exit path.

mod duckdb_store;

use thiserror::Error;

use crate::types::{ColumnType, RawValue};

pub use duckdb_store::{DuckDbSession, DuckDbStore};

/// Failure reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Process-wide handle to a relational database.
pub trait RelationalStore: Send + Sync {
    /// Open a session for one ingestion run.
    fn connect(&self) -> Result<Box<dyn StoreSession + '_>, StoreError>;
}

/// One connection held for the duration of an ingestion run.
pub trait StoreSession {
    /// Whether a table with exactly this name exists.
    fn table_exists(&mut self, name: &str) -> Result<bool, StoreError>;

    /// Execute a DDL or DML statement with positional parameters; returns rows affected.
    fn execute(&mut self, sql: &str, params: &[RawValue]) -> Result<usize, StoreError>;

    /// Type name to declare for a column of `column_type`.
    ///
    /// Backends override this where the generic name would truncate values.
    fn type_name(&self, column_type: ColumnType) -> &'static str {
        column_type.sql_name()
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.execute("BEGIN TRANSACTION", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.execute("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.execute("ROLLBACK", &[]).map(|_| ())
    }
}
