//! Backing-store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Execute parameterized statements on behalf of the in-memory tables.
//! - Convert result sets into `Row`s named after the result columns.
//!
//! # Invariants
//! - Every value crosses the boundary as text: integers and reals use their
//!   shortest decimal form, `NULL` becomes the empty string.
//! - Statements issued while disconnected fail with `StoreError::NotConnected`.

use super::open::{create_db_file, open_db, open_db_in_memory};
use super::{StoreError, StoreResult};
use crate::model::row::Row;
use log::{debug, error, info};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Statement execution contract consumed by the table layer.
pub trait BackingStore {
    /// Runs a mutating statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize>;
    /// Runs a result-set statement; one `Row` per result record.
    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>>;
    /// Reads one integer column of the first result record.
    ///
    /// Returns `None` when there is no record or the value is `NULL`
    /// (e.g. `MAX` over an empty table).
    fn query_scalar(&self, sql: &str, params: &[Value], column: &str)
        -> StoreResult<Option<i64>>;
}

/// SQLite-backed store holding at most one open database file.
#[derive(Default)]
pub struct SqliteStore {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Creates a disconnected store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new database file with the current schema.
    ///
    /// The file is closed again; call `connect` to use it.
    pub fn create_file(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let conn = create_db_file(path.as_ref())?;
        drop(conn);
        info!(
            "event=db_create module=db status=ok path={}",
            path.as_ref().display()
        );
        Ok(())
    }

    /// Connects to a database file, replacing any current connection.
    pub fn connect(&mut self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let conn = open_db(path)?;
        self.disconnect();
        self.conn = Some(conn);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Connects to a fresh in-memory database.
    pub fn connect_in_memory(&mut self) -> StoreResult<()> {
        let conn = open_db_in_memory()?;
        self.disconnect();
        self.conn = Some(conn);
        self.path = None;
        Ok(())
    }

    /// Closes the current connection, if any.
    pub fn disconnect(&mut self) {
        if self.conn.take().is_some() {
            info!("event=db_close module=db status=ok");
        }
        self.path = None;
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Path of the connected file; `None` when disconnected or in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connection(&self) -> StoreResult<&Connection> {
        self.conn.as_ref().ok_or(StoreError::NotConnected)
    }
}

impl BackingStore for SqliteStore {
    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        let conn = self.connection()?;
        match conn.execute(sql, params_from_iter(params.iter())) {
            Ok(changed) => {
                debug!("event=sql_execute module=db status=ok rows={changed}");
                Ok(changed)
            }
            Err(err) => {
                error!(
                    "event=sql_execute module=db status=error sql={} error={}",
                    single_line(sql),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, name) in names.iter().enumerate() {
                let text = value_text(row.get_ref(index)?);
                record
                    .add_column(name.as_str(), text)
                    .map_err(|err| StoreError::InvalidData(err.to_string()))?;
            }
            records.push(record);
        }

        debug!(
            "event=sql_query module=db status=ok rows={}",
            records.len()
        );
        Ok(records)
    }

    fn query_scalar(
        &self,
        sql: &str,
        params: &[Value],
        column: &str,
    ) -> StoreResult<Option<i64>> {
        let conn = self.connection()?;
        let value = conn
            .query_row(sql, params_from_iter(params.iter()), |row| {
                row.get::<_, Option<i64>>(column)
            })
            .optional()?;
        Ok(value.flatten())
    }
}

fn value_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(number) => number.to_string(),
        ValueRef::Real(number) => number.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn single_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
