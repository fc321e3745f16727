//! Finance database context.
//!
//! # Responsibility
//! - Own the backing store and the CashFlow, Budget and Repeat tables.
//! - Create, open, load, clear and close a finance database file.
//! - Forward front-end mutations to the owning table.
//!
//! # Invariants
//! - One context per open database; there is no process-wide instance.
//! - `load` clears every table before repopulating it.
//! - The context is not thread-safe; share it through `service::worker`.

use crate::db::SqliteStore;
use crate::model::date::{format_display_date, MonthCode};
use crate::model::row::Row;
use crate::service::balance::{running_balance, BalancePoint};
use crate::table::budget::Budget;
use crate::table::cash_flow::{
    format_amount, CashFlow, TransactionId, AMOUNT_COLUMN, DATE_COLUMN, DESCRIPTION_COLUMN,
    TRANSACTION_ID_COLUMN,
};
use crate::table::repeat::Repeat;
use crate::table::{CacheSync, SourcedTable, TableResult};
use chrono::NaiveDate;
use log::info;
use std::path::Path;

/// Store plus table caches for one finance database.
pub struct FinanceDatabase {
    store: SqliteStore,
    cash_flow: CashFlow,
    budget: Budget,
    repeat: Repeat,
    loaded_month: Option<MonthCode>,
}

impl FinanceDatabase {
    /// Creates a new database file with every table and connects to it.
    ///
    /// # Errors
    /// - `Store(FileExists)` when `path` already exists.
    pub fn create(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let mut store = SqliteStore::new();
        store.create_file(path)?;
        store.connect(path)?;

        let database = Self::with_store(store)?;
        database.cash_flow.create(&database.store)?;
        database.budget.create(&database.store)?;
        database.repeat.create(&database.store)?;
        info!(
            "event=database_create module=service status=ok path={}",
            path.display()
        );
        Ok(database)
    }

    /// Connects to an existing database file.
    pub fn open(path: impl AsRef<Path>) -> TableResult<Self> {
        let mut store = SqliteStore::new();
        store.connect(path)?;
        Self::with_store(store)
    }

    /// Connects to a fresh in-memory database.
    pub fn open_in_memory() -> TableResult<Self> {
        let mut store = SqliteStore::new();
        store.connect_in_memory()?;
        Self::with_store(store)
    }

    fn with_store(store: SqliteStore) -> TableResult<Self> {
        Ok(Self {
            store,
            cash_flow: CashFlow::new()?,
            budget: Budget::new()?,
            repeat: Repeat::new()?,
            loaded_month: None,
        })
    }

    /// Clears every cache, then loads budgets, schedules and the
    /// transactions of the month containing `date`.
    pub fn load(&mut self, date: NaiveDate) -> TableResult<()> {
        self.clear();
        self.budget.load_from_source(&self.store, date)?;
        self.cash_flow.load_from_source(&self.store, date)?;
        self.repeat.load_from_source(&self.store, date)?;
        self.loaded_month = Some(MonthCode::from_date(date));
        info!(
            "event=database_load module=service status=ok month={} transactions={}",
            MonthCode::from_date(date),
            self.cash_flow.table().len()
        );
        Ok(())
    }

    /// Empties every cache.
    pub fn clear(&mut self) {
        self.budget.clear();
        self.cash_flow.clear();
        self.repeat.clear();
        self.loaded_month = None;
    }

    /// Clears the caches and disconnects the store.
    pub fn close(&mut self) {
        self.clear();
        self.store.disconnect();
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn cash_flow(&self) -> &CashFlow {
        &self.cash_flow
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn repeat(&self) -> &Repeat {
        &self.repeat
    }

    /// Month of the last successful `load`.
    pub fn loaded_month(&self) -> Option<MonthCode> {
        self.loaded_month
    }

    pub fn next_transaction_id(&self) -> TransactionId {
        self.cash_flow.available_transaction_id(&self.store)
    }

    /// Adds a complete CashFlow row.
    pub fn add_transaction(&mut self, row: Row) -> TableResult<()> {
        self.cash_flow.add_row(&self.store, row)
    }

    /// Builds a row with the next available id and adds it.
    pub fn record_transaction(
        &mut self,
        description: &str,
        date: NaiveDate,
        amount: f64,
    ) -> TableResult<TransactionId> {
        let id = self.next_transaction_id();
        let row = Row::from_pairs([
            (DESCRIPTION_COLUMN, description.to_string()),
            (TRANSACTION_ID_COLUMN, id.to_string()),
            (AMOUNT_COLUMN, format_amount(amount)),
            (DATE_COLUMN, format_display_date(date)),
        ])?;
        self.cash_flow.add_row(&self.store, row)?;
        Ok(id)
    }

    /// Deletes a transaction together with its repeat schedule.
    pub fn delete_transaction(&mut self, id: TransactionId) -> TableResult<CacheSync> {
        self.repeat.delete_from(&self.store, id)?;
        self.cash_flow.delete_from(&self.store, id)
    }

    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        column: &str,
        value: &str,
    ) -> TableResult<CacheSync> {
        self.cash_flow.update_row(&self.store, id, column, value)
    }

    /// Upserts a Budget row.
    pub fn set_budget(&mut self, row: Row) -> TableResult<()> {
        self.budget.add_row(&self.store, row)
    }

    pub fn budget_for(&self, month: MonthCode) -> Option<f64> {
        self.budget.budget(month)
    }

    /// Adds a Repeat row for an existing transaction.
    pub fn add_schedule(&mut self, row: Row) -> TableResult<()> {
        self.repeat.add_row(&self.store, row)
    }

    pub fn rows_in_month(&self, month: MonthCode) -> Vec<Row> {
        self.cash_flow.rows_in_month(month)
    }

    /// Running balance of `month`, starting from its budget or
    /// `default_allowance` when no budget is set.
    pub fn balance_series(
        &self,
        month: MonthCode,
        default_allowance: f64,
    ) -> TableResult<Vec<BalancePoint>> {
        let allowance = self.budget.budget(month).unwrap_or(default_allowance);
        let transactions = self.cash_flow.transactions_oldest_first(month)?;
        Ok(running_balance(allowance, &transactions))
    }
}
