//! Budget table: one monthly allowance per month code.
//!
//! # Invariants
//! - At most one cached row per month code.
//! - Amounts are positive and cached in canonical text form.

use crate::db::BackingStore;
use crate::model::date::MonthCode;
use crate::model::row::Row;
use crate::table::cash_flow::format_amount;
use crate::table::{reload, SourcedTable, Table, TableError, TableResult};
use chrono::NaiveDate;
use log::info;
use rusqlite::types::Value;

pub const TABLE_NAME: &str = "Budget";
pub const MONTH_COLUMN: &str = "Month";
pub const AMOUNT_COLUMN: &str = "Amount";

pub const COLUMNS: [&str; 2] = [MONTH_COLUMN, AMOUNT_COLUMN];

pub const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS Budget (
    Month VARCHAR(6) UNIQUE PRIMARY KEY,
    Amount DECIMAL(5,2) NOT NULL
);";

const INSERT_SQL: &str = "INSERT INTO Budget (Month, Amount) VALUES (?1, ?2);";
const UPDATE_SQL: &str = "UPDATE Budget SET Amount = ?1 WHERE Month = ?2;";
const SELECT_ALL_SQL: &str = "SELECT * FROM Budget ORDER BY Month;";

/// Cached view of every monthly allowance.
#[derive(Debug, Clone)]
pub struct Budget {
    table: Table,
}

impl Budget {
    pub fn new() -> TableResult<Self> {
        Ok(Self {
            table: Table::new(COLUMNS)?,
        })
    }

    /// Inserts or replaces the allowance of the row's month.
    ///
    /// # Errors
    /// - `InvalidRow` when the row columns differ from the schema.
    /// - `Format` for a malformed month code or a non-positive amount.
    /// - `Parse` when the amount is not a number.
    /// - `Store` when the statement fails; the cache is left unchanged.
    pub fn add_row(&mut self, store: &dyn BackingStore, row: Row) -> TableResult<()> {
        self.table.ensure_valid(&row)?;
        let month = check_month(row.value(MONTH_COLUMN)?)?;
        let amount = check_allowance(row.value(AMOUNT_COLUMN)?)?;
        let code = month.to_string();

        match self.table.position(MONTH_COLUMN, &code) {
            Some(index) => {
                store.execute(UPDATE_SQL, &[Value::Real(amount), Value::Text(code.clone())])?;
                if let Some(cached) = self.table.row_mut(index) {
                    cached.update_column(AMOUNT_COLUMN, format_amount(amount))?;
                }
                info!("event=budget_update module=budget status=ok month={code}");
            }
            None => {
                store.execute(INSERT_SQL, &[Value::Text(code.clone()), Value::Real(amount)])?;
                let cached = Row::from_pairs([
                    (MONTH_COLUMN, code.clone()),
                    (AMOUNT_COLUMN, format_amount(amount)),
                ])?;
                self.table.add_row(cached)?;
                info!("event=budget_insert module=budget status=ok month={code}");
            }
        }
        Ok(())
    }

    /// Sets the allowance for `month`.
    pub fn set_budget(
        &mut self,
        store: &dyn BackingStore,
        month: MonthCode,
        amount: f64,
    ) -> TableResult<()> {
        let row = Row::from_pairs([
            (MONTH_COLUMN, month.to_string()),
            (AMOUNT_COLUMN, format_amount(amount)),
        ])?;
        self.add_row(store, row)
    }

    /// Returns the allowance of `month`, or `None` when no budget is set.
    pub fn budget(&self, month: MonthCode) -> Option<f64> {
        self.table
            .find_row(MONTH_COLUMN, &month.to_string())
            .and_then(|row| row.value(AMOUNT_COLUMN).ok())
            .and_then(|amount| amount.parse::<f64>().ok())
    }
}

impl SourcedTable for Budget {
    fn table(&self) -> &Table {
        &self.table
    }

    /// Loads every month; `reference` is unused.
    fn load_from_source(
        &mut self,
        store: &dyn BackingStore,
        _reference: NaiveDate,
    ) -> TableResult<usize> {
        reload(&mut self.table, store, TABLE_NAME, SELECT_ALL_SQL, &[], Ok)
    }

    fn create(&self, store: &dyn BackingStore) -> TableResult<()> {
        store.execute(CREATE_SQL, &[])?;
        Ok(())
    }

    fn clear(&mut self) {
        self.table.clear();
    }
}

fn check_month(value: &str) -> TableResult<MonthCode> {
    MonthCode::parse(value).ok_or_else(|| TableError::Format {
        column: MONTH_COLUMN,
        value: value.to_string(),
    })
}

fn check_allowance(value: &str) -> TableResult<f64> {
    let amount = match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => amount,
        _ => {
            return Err(TableError::Parse {
                column: AMOUNT_COLUMN,
                value: value.to_string(),
            })
        }
    };
    if amount <= 0.0 {
        return Err(TableError::Format {
            column: AMOUNT_COLUMN,
            value: value.to_string(),
        });
    }
    Ok(amount)
}
