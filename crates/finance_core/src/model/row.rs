//! Row record shared by every table.
//!
//! # Responsibility
//! - Hold one record as column name -> text value pairs.
//! - Provide structural equality and a matching content-derived hash.
//!
//! # Invariants
//! - Column names are non-empty and unique within a row.
//! - Enumeration order is insertion order; equality and hashing ignore order.

use crate::table::{TableError, TableResult};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// One record: an insertion-ordered set of `(column, value)` cells.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs.
    ///
    /// # Errors
    /// - Same as `add_column` for every pair.
    pub fn from_pairs<I, C, V>(pairs: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.add_column(column, value)?;
        }
        Ok(row)
    }

    /// Appends a new column.
    ///
    /// # Errors
    /// - `TableError::Schema` when `column` is empty.
    /// - `TableError::DuplicateColumn` when `column` is already present.
    pub fn add_column(
        &mut self,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> TableResult<()> {
        let column = column.into();
        if column.is_empty() {
            return Err(TableError::Schema("column names must not be empty".to_string()));
        }
        if self.has_column(&column) {
            return Err(TableError::DuplicateColumn(column));
        }
        self.cells.push((column, value.into()));
        Ok(())
    }

    /// Returns column names in insertion order.
    pub fn columns(&self) -> Vec<&str> {
        self.cells.iter().map(|(column, _)| column.as_str()).collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    /// Returns the value stored under `column`.
    ///
    /// # Errors
    /// - `TableError::KeyNotFound` when the column is absent.
    pub fn value(&self, column: &str) -> TableResult<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| TableError::KeyNotFound(column.to_string()))
    }

    /// Replaces the value of `column`, appending the column when absent.
    ///
    /// # Errors
    /// - `TableError::Schema` when `column` is empty.
    pub fn update_column(
        &mut self,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> TableResult<()> {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, current)) => *current = value,
            None if column.is_empty() => {
                return Err(TableError::Schema("column names must not be empty".to_string()))
            }
            None => self.cells.push((column, value)),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn sorted_cells(&self) -> Vec<(&str, &str)> {
        let mut cells: Vec<(&str, &str)> = self
            .cells
            .iter()
            .map(|(column, value)| (column.as_str(), value.as_str()))
            .collect();
        cells.sort_unstable();
        cells
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.cells.len() == other.cells.len() && self.sorted_cells() == other.sorted_cells()
    }
}

impl Eq for Row {}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (column, value) in self.sorted_cells() {
            column.hash(state);
            value.hash(state);
        }
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (column, value) in &self.cells {
            write!(f, "{column}: {value} ")?;
        }
        Ok(())
    }
}
