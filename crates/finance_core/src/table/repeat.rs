//! Repeat table: recurrence windows attached to CashFlow transactions.
//!
//! Schedules are stored and cached only; expanding them into CashFlow rows
//! is not performed.

use crate::db::BackingStore;
use crate::model::date::{format_display_date, format_storage_date, storage_to_display};
use crate::model::row::Row;
use crate::table::cash_flow::{
    check_date, check_transaction_id, TransactionId, TRANSACTION_ID_COLUMN,
};
use crate::table::{reload, CacheSync, SourcedTable, Table, TableError, TableResult};
use chrono::NaiveDate;
use log::info;
use rusqlite::types::Value;

pub const TABLE_NAME: &str = "Repeat";
pub const START_DATE_COLUMN: &str = "Start_Date";
pub const END_DATE_COLUMN: &str = "End_Date";

pub const COLUMNS: [&str; 3] = [TRANSACTION_ID_COLUMN, START_DATE_COLUMN, END_DATE_COLUMN];

pub const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS Repeat (
    Transaction_ID INTEGER UNIQUE PRIMARY KEY
        REFERENCES CashFlow (Transaction_ID),
    Start_Date DATE NOT NULL,
    End_Date DATE NOT NULL
);";

const INSERT_SQL: &str =
    "INSERT INTO Repeat (Transaction_ID, Start_Date, End_Date) VALUES (?1, ?2, ?3);";
const DELETE_SQL: &str = "DELETE FROM Repeat WHERE Transaction_ID = ?1;";
const SELECT_ALL_SQL: &str = "SELECT * FROM Repeat ORDER BY Transaction_ID;";

/// Cached view of every repeat schedule.
#[derive(Debug, Clone)]
pub struct Repeat {
    table: Table,
}

impl Repeat {
    pub fn new() -> TableResult<Self> {
        Ok(Self {
            table: Table::new(COLUMNS)?,
        })
    }

    /// Registers a schedule for an existing transaction.
    ///
    /// # Errors
    /// - `InvalidRow` when the row columns differ from the schema.
    /// - `Format` for malformed dates or an end date before the start date.
    /// - `Parse` for a malformed transaction id.
    /// - `Store` when the insert fails, including an unknown transaction id.
    pub fn add_row(&mut self, store: &dyn BackingStore, row: Row) -> TableResult<()> {
        self.table.ensure_valid(&row)?;
        let id = check_transaction_id(row.value(TRANSACTION_ID_COLUMN)?)?;
        let start = check_date(row.value(START_DATE_COLUMN)?)?;
        let end_text = row.value(END_DATE_COLUMN)?;
        let end = check_date(end_text)?;
        if end < start {
            return Err(TableError::Format {
                column: END_DATE_COLUMN,
                value: end_text.to_string(),
            });
        }

        store.execute(
            INSERT_SQL,
            &[
                Value::Integer(id),
                Value::Text(format_storage_date(start)),
                Value::Text(format_storage_date(end)),
            ],
        )?;
        self.table.add_row(schedule_row(id, start, end)?)?;

        info!("event=repeat_add module=repeat status=ok id={id}");
        Ok(())
    }

    /// Returns the cached schedule of transaction `id`.
    pub fn schedule_for(&self, id: TransactionId) -> Option<&Row> {
        self.table.find_row(TRANSACTION_ID_COLUMN, &id.to_string())
    }

    /// Removes the schedule of transaction `id` from the store and cache.
    pub fn delete_from(
        &mut self,
        store: &dyn BackingStore,
        id: TransactionId,
    ) -> TableResult<CacheSync> {
        let changed = store.execute(DELETE_SQL, &[Value::Integer(id)])?;
        let cached = match self.table.position(TRANSACTION_ID_COLUMN, &id.to_string()) {
            Some(index) => {
                self.table.remove_at(index)?;
                true
            }
            None => false,
        };
        Ok(match (changed, cached) {
            (0, _) => CacheSync::Missing,
            (_, true) => CacheSync::Applied,
            (_, false) => CacheSync::StoreOnly,
        })
    }
}

impl SourcedTable for Repeat {
    fn table(&self) -> &Table {
        &self.table
    }

    /// Loads every schedule; `reference` is unused.
    fn load_from_source(
        &mut self,
        store: &dyn BackingStore,
        _reference: NaiveDate,
    ) -> TableResult<usize> {
        reload(
            &mut self.table,
            store,
            TABLE_NAME,
            SELECT_ALL_SQL,
            &[],
            stored_row_to_cached,
        )
    }

    fn create(&self, store: &dyn BackingStore) -> TableResult<()> {
        store.execute(CREATE_SQL, &[])?;
        Ok(())
    }

    fn clear(&mut self) {
        self.table.clear();
    }
}

fn schedule_row(id: TransactionId, start: NaiveDate, end: NaiveDate) -> TableResult<Row> {
    Row::from_pairs([
        (TRANSACTION_ID_COLUMN, id.to_string()),
        (START_DATE_COLUMN, format_display_date(start)),
        (END_DATE_COLUMN, format_display_date(end)),
    ])
}

fn stored_row_to_cached(mut row: Row) -> TableResult<Row> {
    for column in [START_DATE_COLUMN, END_DATE_COLUMN] {
        let stored = row.value(column)?.to_string();
        let display = storage_to_display(&stored).ok_or(TableError::Format {
            column,
            value: stored,
        })?;
        row.update_column(column, display)?;
    }
    Ok(row)
}
