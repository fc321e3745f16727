//! Core logic for the personal finance tracker.
//! Row/Table caches over SQLite-backed CashFlow, Budget and Repeat tables.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod table;

pub use config::{ConfigError, DataPaths, Settings};
pub use db::{BackingStore, SqliteStore, StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::date::MonthCode;
pub use model::row::Row;
pub use service::balance::{BalancePoint, DEFAULT_ALLOWANCE};
pub use service::database::FinanceDatabase;
pub use service::worker::{spawn_worker, FinanceHandle, FinanceWorker, WorkerError};
pub use table::budget::Budget;
pub use table::cash_flow::{CashFlow, TiePlacement, Transaction, TransactionId};
pub use table::repeat::Repeat;
pub use table::{CacheSync, SourcedTable, Table, TableError, TableResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
