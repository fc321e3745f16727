//! CashFlow table: dated income/expense transactions.
//!
//! # Responsibility
//! - Cache one month of transactions ordered newest first.
//! - Validate transaction fields before they reach the store.
//! - Keep store and cache in step for insert, update and delete.
//!
//! # Invariants
//! - Cached rows are in non-increasing `Transaction_Date` order.
//! - Cached dates use `dd/mm/yyyy`; stored dates use `yyyy-mm-dd`.
//! - Cached amounts use the canonical text the store returns for them.
//! - New ids follow the max+1 policy; gaps left by deletions are not refilled.

use crate::db::BackingStore;
use crate::model::date::{
    format_display_date, format_storage_date, month_bounds, parse_display_date,
    storage_to_display, MonthCode,
};
use crate::model::row::Row;
use crate::table::{reload, CacheSync, SourcedTable, Table, TableError, TableResult};
use chrono::NaiveDate;
use log::{error, info, warn};
use rusqlite::types::Value;

pub const TABLE_NAME: &str = "CashFlow";
pub const TRANSACTION_ID_COLUMN: &str = "Transaction_ID";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const DATE_COLUMN: &str = "Transaction_Date";
pub const AMOUNT_COLUMN: &str = "Amount";

/// Maximum number of characters in a description.
pub const DESCRIPTION_LENGTH: usize = 50;

pub const COLUMNS: [&str; 4] = [
    DESCRIPTION_COLUMN,
    TRANSACTION_ID_COLUMN,
    AMOUNT_COLUMN,
    DATE_COLUMN,
];

pub const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS CashFlow (
    Transaction_ID INTEGER UNIQUE PRIMARY KEY,
    Description VARCHAR(50) NOT NULL,
    Transaction_Date DATE NOT NULL,
    Amount DECIMAL(5,2) NOT NULL
);";

const INSERT_SQL: &str = "INSERT INTO CashFlow (
    Transaction_ID,
    Description,
    Transaction_Date,
    Amount
) VALUES (?1, ?2, ?3, ?4);";

const SELECT_MONTH_SQL: &str = "SELECT * FROM CashFlow
WHERE Transaction_Date >= ?1 AND Transaction_Date < ?2
ORDER BY Transaction_Date DESC, Transaction_ID DESC;";

const MAX_ID_SQL: &str = "SELECT MAX(Transaction_ID) AS Maximum FROM CashFlow;";
const MAX_ID_COLUMN: &str = "Maximum";

const DELETE_SQL: &str = "DELETE FROM CashFlow WHERE Transaction_ID = ?1;";

/// Transaction identifier; never negative.
pub type TransactionId = i64;

/// Where a new row goes relative to cached rows with the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiePlacement {
    /// Before every row with an equal date (newest entry first).
    #[default]
    BeforeEqual,
    /// After every row with an equal date.
    AfterEqual,
}

impl TiePlacement {
    /// Binary-searches `dates` (non-increasing) for the insertion index of
    /// `date`.
    pub fn insertion_index(self, dates: &[NaiveDate], date: NaiveDate) -> usize {
        self.insertion_index_by(dates, date, |current| Some(*current))
    }

    /// Same as `insertion_index`, reading each item's date with `date_of`.
    ///
    /// Only items visited by the binary search are read. An item without a
    /// date sorts as newer than `date`.
    pub fn insertion_index_by<T>(
        self,
        items: &[T],
        date: NaiveDate,
        date_of: impl Fn(&T) -> Option<NaiveDate>,
    ) -> usize {
        match self {
            Self::BeforeEqual => {
                items.partition_point(|item| date_of(item).map_or(true, |current| current > date))
            }
            Self::AfterEqual => {
                items.partition_point(|item| date_of(item).map_or(true, |current| current >= date))
            }
        }
    }
}

/// Typed view of one CashFlow row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    pub date: NaiveDate,
    /// Negative for money out, positive for money in.
    pub amount: f64,
}

impl Transaction {
    /// Parses and validates every field of a CashFlow row.
    pub fn from_row(row: &Row) -> TableResult<Self> {
        let id = check_transaction_id(row.value(TRANSACTION_ID_COLUMN)?)?;
        let description = row.value(DESCRIPTION_COLUMN)?;
        check_description(description)?;
        let date = check_date(row.value(DATE_COLUMN)?)?;
        let amount = check_amount(row.value(AMOUNT_COLUMN)?)?;
        Ok(Self {
            id,
            description: description.to_string(),
            date,
            amount,
        })
    }

    /// Builds the canonical cached row for this transaction.
    pub fn to_row(&self) -> TableResult<Row> {
        Row::from_pairs([
            (DESCRIPTION_COLUMN, self.description.clone()),
            (TRANSACTION_ID_COLUMN, self.id.to_string()),
            (AMOUNT_COLUMN, format_amount(self.amount)),
            (DATE_COLUMN, format_display_date(self.date)),
        ])
    }
}

/// Checks a `dd/mm/yyyy` value that is also a real calendar date.
pub fn check_date(value: &str) -> TableResult<NaiveDate> {
    parse_display_date(value).ok_or_else(|| TableError::Format {
        column: DATE_COLUMN,
        value: value.to_string(),
    })
}

/// Checks that a description fits `DESCRIPTION_LENGTH` characters.
pub fn check_description(value: &str) -> TableResult<()> {
    let actual = value.chars().count();
    if actual > DESCRIPTION_LENGTH {
        return Err(TableError::Length {
            column: DESCRIPTION_COLUMN,
            max: DESCRIPTION_LENGTH,
            actual,
        });
    }
    Ok(())
}

/// Checks that an amount parses as a finite decimal number.
pub fn check_amount(value: &str) -> TableResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(TableError::Parse {
            column: AMOUNT_COLUMN,
            value: value.to_string(),
        }),
    }
}

/// Checks that a transaction id is a non-negative integer.
pub fn check_transaction_id(value: &str) -> TableResult<TransactionId> {
    match value.trim().parse::<TransactionId>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(TableError::Parse {
            column: TRANSACTION_ID_COLUMN,
            value: value.to_string(),
        }),
    }
}

/// Canonical amount text: the shortest decimal form, as SQLite returns it.
///
/// Negative zero is written as `0`; SQLite stores it as integer zero.
pub fn format_amount(amount: f64) -> String {
    let amount = if amount == 0.0 { 0.0 } else { amount };
    amount.to_string()
}

/// Cached view of the CashFlow table for the loaded month.
#[derive(Debug, Clone)]
pub struct CashFlow {
    table: Table,
    tie_placement: TiePlacement,
}

impl CashFlow {
    pub fn new() -> TableResult<Self> {
        Self::with_tie_placement(TiePlacement::default())
    }

    /// Creates the table with an explicit equal-date placement policy.
    pub fn with_tie_placement(tie_placement: TiePlacement) -> TableResult<Self> {
        Ok(Self {
            table: Table::new(COLUMNS)?,
            tie_placement,
        })
    }

    pub fn tie_placement(&self) -> TiePlacement {
        self.tie_placement
    }

    /// Inserts a transaction into the store and the ordered cache.
    ///
    /// # Errors
    /// - `InvalidRow` when the row columns differ from the schema.
    /// - Field errors (`Format`, `Length`, `Parse`) from validation.
    /// - `Store` when the insert fails; the cache is left unchanged.
    pub fn add_row(&mut self, store: &dyn BackingStore, row: Row) -> TableResult<()> {
        self.table.ensure_valid(&row)?;
        let transaction = Transaction::from_row(&row)?;
        let index = self.insertion_index(transaction.date);

        store.execute(
            INSERT_SQL,
            &[
                Value::Integer(transaction.id),
                Value::Text(transaction.description.clone()),
                Value::Text(format_storage_date(transaction.date)),
                Value::Real(transaction.amount),
            ],
        )?;
        self.table.insert_row(index, transaction.to_row()?)?;

        info!(
            "event=transaction_add module=cash_flow status=ok id={} index={}",
            transaction.id, index
        );
        Ok(())
    }

    /// Returns the next id under the monotonic max+1 policy.
    ///
    /// Returns `0` for an empty table. A failing query is logged and also
    /// yields `0`; the following insert then reports the conflict.
    pub fn available_transaction_id(&self, store: &dyn BackingStore) -> TransactionId {
        match store.query_scalar(MAX_ID_SQL, &[], MAX_ID_COLUMN) {
            Ok(Some(max)) => max.saturating_add(1),
            Ok(None) => 0,
            Err(err) => {
                error!(
                    "event=transaction_next_id module=cash_flow status=error error_code=store_query_failed error={}",
                    err
                );
                0
            }
        }
    }

    /// Returns cached rows dated in `month` of its year, in cache order.
    pub fn rows_in_month(&self, month: MonthCode) -> Vec<Row> {
        self.table
            .rows()
            .iter()
            .filter(|row| row_in_month(row, month))
            .cloned()
            .collect()
    }

    /// Counts cached rows dated in `month` of its year.
    pub fn number_of_rows(&self, month: MonthCode) -> usize {
        self.table
            .rows()
            .iter()
            .filter(|row| row_in_month(row, month))
            .count()
    }

    /// Returns typed transactions for `month`, oldest first.
    pub fn transactions_oldest_first(&self, month: MonthCode) -> TableResult<Vec<Transaction>> {
        self.table
            .rows()
            .iter()
            .rev()
            .filter(|row| row_in_month(row, month))
            .map(Transaction::from_row)
            .collect()
    }

    /// Deletes a transaction by id from the store, then from the cache.
    ///
    /// Deleting an id that is not in the store is a no-op that reports
    /// `CacheSync::Missing`.
    pub fn delete_from(
        &mut self,
        store: &dyn BackingStore,
        id: TransactionId,
    ) -> TableResult<CacheSync> {
        let changed = store.execute(DELETE_SQL, &[Value::Integer(id)])?;

        let cached = match self.position_of(id) {
            Some(index) => {
                self.table.remove_at(index)?;
                true
            }
            None => false,
        };
        let sync = match (changed, cached) {
            (0, _) => CacheSync::Missing,
            (_, true) => CacheSync::Applied,
            (_, false) => CacheSync::StoreOnly,
        };
        info!(
            "event=transaction_delete module=cash_flow status=ok id={} cache={:?}",
            id, sync
        );
        Ok(sync)
    }

    /// Updates one column of a transaction in the store and the cache.
    ///
    /// Only `Transaction_Date`, `Description` and `Amount` are updatable.
    /// A date change moves the cached row to keep the date order.
    ///
    /// # Errors
    /// - `InvalidColumn` for any other column.
    /// - `Format` / `Length` / `Parse` when `value` fails the column check.
    /// - `Store` when the update fails; the cache is left unchanged.
    ///
    /// An id with no store row reports `CacheSync::Missing`.
    pub fn update_row(
        &mut self,
        store: &dyn BackingStore,
        id: TransactionId,
        column: &str,
        value: &str,
    ) -> TableResult<CacheSync> {
        let (column, stored, cached, new_date) = match column {
            DATE_COLUMN => {
                let date = check_date(value)?;
                (
                    DATE_COLUMN,
                    Value::Text(format_storage_date(date)),
                    format_display_date(date),
                    Some(date),
                )
            }
            DESCRIPTION_COLUMN => {
                check_description(value)?;
                (
                    DESCRIPTION_COLUMN,
                    Value::Text(value.to_string()),
                    value.to_string(),
                    None,
                )
            }
            AMOUNT_COLUMN => {
                let amount = check_amount(value)?;
                (
                    AMOUNT_COLUMN,
                    Value::Real(amount),
                    format_amount(amount),
                    None,
                )
            }
            other => return Err(TableError::InvalidColumn(other.to_string())),
        };

        let sql =
            format!("UPDATE {TABLE_NAME} SET {column} = ?1 WHERE {TRANSACTION_ID_COLUMN} = ?2;");
        let changed = store.execute(&sql, &[stored, Value::Integer(id)])?;
        if changed == 0 {
            warn!(
                "event=transaction_update module=cash_flow status=ok id={} column={} cache=Missing",
                id, column
            );
            return Ok(CacheSync::Missing);
        }

        let Some(index) = self.position_of(id) else {
            warn!(
                "event=transaction_update module=cash_flow status=ok id={} column={} cache=StoreOnly",
                id, column
            );
            return Ok(CacheSync::StoreOnly);
        };

        match new_date {
            Some(date) => {
                let mut row = self.table.remove_at(index)?;
                row.update_column(column, cached)?;
                let target = self.insertion_index(date);
                self.table.insert_row(target, row)?;
            }
            None => {
                if let Some(row) = self.table.row_mut(index) {
                    row.update_column(column, cached)?;
                }
            }
        }

        info!(
            "event=transaction_update module=cash_flow status=ok id={} column={} cache=Applied",
            id, column
        );
        Ok(CacheSync::Applied)
    }

    fn position_of(&self, id: TransactionId) -> Option<usize> {
        self.table.position(TRANSACTION_ID_COLUMN, &id.to_string())
    }

    fn insertion_index(&self, date: NaiveDate) -> usize {
        self.tie_placement
            .insertion_index_by(self.table.rows(), date, |row| {
                row.value(DATE_COLUMN).ok().and_then(parse_display_date)
            })
    }
}

impl SourcedTable for CashFlow {
    fn table(&self) -> &Table {
        &self.table
    }

    /// Loads the month containing `start`, newest first.
    fn load_from_source(
        &mut self,
        store: &dyn BackingStore,
        start: NaiveDate,
    ) -> TableResult<usize> {
        let (from, to) = month_bounds(start).ok_or_else(|| TableError::Format {
            column: DATE_COLUMN,
            value: start.to_string(),
        })?;

        reload(
            &mut self.table,
            store,
            TABLE_NAME,
            SELECT_MONTH_SQL,
            &[
                Value::Text(format_storage_date(from)),
                Value::Text(format_storage_date(to)),
            ],
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

fn stored_row_to_cached(mut row: Row) -> TableResult<Row> {
    let stored = row.value(DATE_COLUMN)?.to_string();
    let display = storage_to_display(&stored).ok_or(TableError::Format {
        column: DATE_COLUMN,
        value: stored,
    })?;
    row.update_column(DATE_COLUMN, display)?;
    Ok(row)
}

fn row_in_month(row: &Row, month: MonthCode) -> bool {
    row.value(DATE_COLUMN)
        .ok()
        .and_then(parse_display_date)
        .is_some_and(|date| month.contains(date))
}
