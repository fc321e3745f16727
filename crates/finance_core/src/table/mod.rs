//! In-memory tables cached over the backing store.
//!
//! # Responsibility
//! - Hold rows under a fixed, validated column schema.
//! - Define the error taxonomy shared by every table operation.
//! - Define the `SourcedTable` capability implemented by CashFlow, Budget
//!   and Repeat.
//!
//! # Invariants
//! - Column titles are non-empty and pairwise unique.
//! - Every cached row has exactly the table's column set.
//! - Domain tables write to the store before touching the cache, so a store
//!   failure never leaves a cached row the store does not have.

use crate::db::{BackingStore, StoreError};
use crate::model::row::Row;
use chrono::NaiveDate;
use log::{error, info};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod budget;
pub mod cash_flow;
pub mod repeat;

pub type TableResult<T> = Result<T, TableError>;

/// Errors raised by row, table and domain-table operations.
#[derive(Debug)]
pub enum TableError {
    /// Empty, duplicate or missing column titles.
    Schema(String),
    /// Row column set differs from the table schema.
    InvalidRow(String),
    /// A required row argument was absent.
    NullRow,
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    KeyNotFound(String),
    DuplicateColumn(String),
    /// Column is not an updatable attribute of the table.
    InvalidColumn(String),
    /// Value does not have the column's required shape.
    Format {
        column: &'static str,
        value: String,
    },
    Length {
        column: &'static str,
        max: usize,
        actual: usize,
    },
    /// Value does not parse as the column's number type.
    Parse {
        column: &'static str,
        value: String,
    },
    Store(StoreError),
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(message) => write!(f, "invalid table schema: {message}"),
            Self::InvalidRow(row) => write!(f, "row does not match table schema: {row}"),
            Self::NullRow => write!(f, "row is required"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for table of {len} rows")
            }
            Self::KeyNotFound(column) => write!(f, "column not found: {column}"),
            Self::DuplicateColumn(column) => write!(f, "column already present: {column}"),
            Self::InvalidColumn(column) => write!(f, "column cannot be updated: {column}"),
            Self::Format { column, value } => {
                write!(f, "value `{value}` is not in the format required by {column}")
            }
            Self::Length {
                column,
                max,
                actual,
            } => write!(
                f,
                "{column} may only be {max} characters long, got {actual}"
            ),
            Self::Parse { column, value } => {
                write!(f, "value `{value}` is not a valid number for {column}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TableError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of a store-first mutation addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSync {
    /// Store and cache were both updated.
    Applied,
    /// The store row changed but no cached row matched (e.g. the row
    /// belongs to a month that is not loaded).
    StoreOnly,
    /// No store row has the id; nothing was changed.
    Missing,
}

/// Capability shared by tables that mirror a table in the backing store.
pub trait SourcedTable {
    /// Read access to the cached rows and schema.
    fn table(&self) -> &Table;
    /// Replaces the cache with the rows selected by `reference`.
    ///
    /// Returns the number of cached rows.
    fn load_from_source(
        &mut self,
        store: &dyn BackingStore,
        reference: NaiveDate,
    ) -> TableResult<usize>;
    /// Issues the schema creation statement.
    fn create(&self, store: &dyn BackingStore) -> TableResult<()>;
    /// Empties the cache; the schema is retained.
    fn clear(&mut self);
}

/// Ordered rows under a fixed column schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table.
    ///
    /// # Errors
    /// - `TableError::Schema` when `columns` is empty, contains an empty
    ///   title, or repeats a title.
    pub fn new<I, S>(columns: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_column_titles(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Creates a table holding `rows` in the given order.
    ///
    /// # Errors
    /// - Schema errors as in `new`.
    /// - `TableError::NullRow` for an absent row.
    /// - `TableError::InvalidRow` for a row whose columns differ from the schema.
    pub fn with_rows<I, S, R>(columns: I, rows: R) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Option<Row>>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            let row = row.ok_or(TableError::NullRow)?;
            table.add_row(row)?;
        }
        Ok(table)
    }

    /// Inserts `row` at `index`, shifting later rows.
    pub fn insert_row(&mut self, index: usize, row: Row) -> TableResult<()> {
        self.ensure_valid(&row)?;
        if index > self.rows.len() {
            return Err(TableError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        self.rows.insert(index, row);
        Ok(())
    }

    /// Appends `row`.
    pub fn add_row(&mut self, row: Row) -> TableResult<()> {
        self.ensure_valid(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Returns the first row whose `column` equals `value`.
    pub fn find_row(&self, column: &str, value: &str) -> Option<&Row> {
        self.position(column, value).map(|index| &self.rows[index])
    }

    /// Returns the index of the first row whose `column` equals `value`.
    pub fn position(&self, column: &str, value: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.value(column).is_ok_and(|current| current == value))
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> TableResult<&Row> {
        self.rows.get(index).ok_or(TableError::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    /// Returns all rows in current order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Removes the first row structurally equal to `row`.
    ///
    /// Returns `false` when no such row is cached.
    pub fn remove(&mut self, row: &Row) -> bool {
        match self.rows.iter().position(|current| current == row) {
            Some(index) => {
                self.rows.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns whether `row` has exactly this table's column set.
    ///
    /// Each row column consumes one entry of a checklist built from the
    /// schema; an unknown or repeated column fails immediately and leftover
    /// entries mean missing columns.
    pub fn is_valid_row(&self, row: &Row) -> bool {
        let mut checklist: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        for column in row.columns() {
            match checklist.iter().position(|expected| *expected == column) {
                Some(index) => {
                    checklist.swap_remove(index);
                }
                None => return false,
            }
        }
        checklist.is_empty()
    }

    pub(crate) fn ensure_valid(&self, row: &Row) -> TableResult<()> {
        if self.is_valid_row(row) {
            Ok(())
        } else {
            Err(TableError::InvalidRow(row.to_string()))
        }
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> TableResult<Row> {
        if index >= self.rows.len() {
            return Err(TableError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Validates every row, then swaps the cache contents.
    pub(crate) fn replace_rows(&mut self, rows: Vec<Row>) -> TableResult<()> {
        for row in &rows {
            self.ensure_valid(row)?;
        }
        self.rows = rows;
        Ok(())
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

fn check_column_titles(columns: &[String]) -> TableResult<()> {
    if columns.is_empty() {
        return Err(TableError::Schema("no column titles specified".to_string()));
    }
    for (index, title) in columns.iter().enumerate() {
        if title.is_empty() {
            return Err(TableError::Schema(format!(
                "column title at position {index} is empty"
            )));
        }
        if columns[..index].contains(title) {
            return Err(TableError::Schema(format!(
                "column title `{title}` is not unique"
            )));
        }
    }
    Ok(())
}

/// Replaces `table` with the converted result of `sql`.
///
/// A failing query is logged and degrades to an empty cache; conversion and
/// schema errors are returned.
pub(crate) fn reload<F>(
    table: &mut Table,
    store: &dyn BackingStore,
    table_name: &str,
    sql: &str,
    params: &[Value],
    convert: F,
) -> TableResult<usize>
where
    F: Fn(Row) -> TableResult<Row>,
{
    let fetched = match store.query(sql, params) {
        Ok(rows) => rows,
        Err(err) => {
            error!(
                "event=table_load module=table status=error table={} error_code=store_query_failed error={}",
                table_name, err
            );
            table.clear();
            return Ok(0);
        }
    };

    let rows = fetched
        .into_iter()
        .map(convert)
        .collect::<TableResult<Vec<_>>>()?;
    table.replace_rows(rows)?;

    info!(
        "event=table_load module=table status=ok table={} rows={}",
        table_name,
        table.len()
    );
    Ok(table.len())
}
