use std::path::Path;
use std::sync::Mutex;

use duckdb::types::{TimeUnit, Value};
use duckdb::{params, params_from_iter, Connection};

use super::{RelationalStore, StoreError, StoreSession};
use crate::schema::plan::quote_ident;
use crate::types::{ColumnType, RawValue};

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::new(err.to_string())
    }
}

/// DuckDB-backed store. Sessions are independent connections to the same database.
pub struct DuckDbStore {
    root: Mutex<Connection>,
    location: String,
}

impl DuckDbStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Ok(Self {
            root: Mutex::new(conn),
            location: path.display().to_string(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            root: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn session(&self) -> Result<DuckDbSession, StoreError> {
        let root = self
            .root
            .lock()
            .map_err(|_| StoreError::new("store connection mutex poisoned"))?;
        Ok(DuckDbSession {
            conn: root.try_clone()?,
        })
    }

    /// Number of rows currently in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        let session = self.session()?;
        let count: i64 = session.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// `(column_name, data_type)` pairs of `table` in ordinal order, as reported by the catalog.
    pub fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, StoreError> {
        let session = self.session()?;
        let mut stmt = session.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map(params![table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl RelationalStore for DuckDbStore {
    fn connect(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
        Ok(Box::new(self.session()?))
    }
}

/// A single DuckDB connection; dropping it closes the connection.
pub struct DuckDbSession {
    conn: Connection,
}

impl StoreSession for DuckDbSession {
    fn table_exists(&mut self, name: &str) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = ?)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn execute(&mut self, sql: &str, params: &[RawValue]) -> Result<usize, StoreError> {
        let values: Vec<Value> = params.iter().map(to_duckdb_value).collect();
        Ok(self.conn.execute(sql, params_from_iter(values.iter()))?)
    }

    // A bare NUMERIC is DECIMAL(18,3) here; DOUBLE holds every f64 a reader produces.
    fn type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Numeric => "DOUBLE",
            other => other.sql_name(),
        }
    }
}

fn to_duckdb_value(value: &RawValue) -> Value {
    match value {
        RawValue::Empty => Value::Null,
        RawValue::Text(s) => Value::Text(s.clone()),
        RawValue::Int(i) => Value::BigInt(*i),
        RawValue::Float(f) => Value::Double(*f),
        RawValue::Bool(b) => Value::Boolean(*b),
        RawValue::DateTime(dt) => Value::Timestamp(TimeUnit::Microsecond, dt.and_utc().timestamp_micros()),
    }
}
