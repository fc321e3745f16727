//! Single-owner worker for a `FinanceDatabase`.
//!
//! # Responsibility
//! - Confine every table mutation to one thread.
//! - Accept front-end requests as messages and answer on reply channels.
//!
//! # Invariants
//! - Commands are applied strictly in arrival order.
//! - Display reads are snapshots taken by the owning thread between commands.
//! - `Shutdown` stops the loop and hands the database back to the caller.

use crate::model::date::MonthCode;
use crate::model::row::Row;
use crate::service::balance::BalancePoint;
use crate::service::database::FinanceDatabase;
use crate::table::cash_flow::TransactionId;
use crate::table::{CacheSync, TableError, TableResult};
use chrono::NaiveDate;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

const WORKER_THREAD_NAME: &str = "finance-worker";

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors seen by callers of a `FinanceHandle`.
#[derive(Debug)]
pub enum WorkerError {
    Table(TableError),
    /// The worker thread has stopped.
    Disconnected,
    Spawn(std::io::Error),
}

impl Display for WorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table(err) => write!(f, "{err}"),
            Self::Disconnected => write!(f, "finance worker is not running"),
            Self::Spawn(err) => write!(f, "failed to start finance worker: {err}"),
        }
    }
}

impl Error for WorkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Table(err) => Some(err),
            Self::Disconnected => None,
            Self::Spawn(err) => Some(err),
        }
    }
}

impl From<TableError> for WorkerError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

/// Request message handled by the worker thread.
///
/// Row payloads are optional: an absent row is answered with
/// `TableError::NullRow`.
pub enum FinanceCommand {
    AddTransaction {
        row: Option<Row>,
        reply: Sender<TableResult<()>>,
    },
    RecordTransaction {
        description: String,
        date: NaiveDate,
        amount: f64,
        reply: Sender<TableResult<TransactionId>>,
    },
    DeleteTransaction {
        id: TransactionId,
        reply: Sender<TableResult<CacheSync>>,
    },
    UpdateTransaction {
        id: TransactionId,
        column: String,
        value: String,
        reply: Sender<TableResult<CacheSync>>,
    },
    SetBudget {
        row: Option<Row>,
        reply: Sender<TableResult<()>>,
    },
    AddSchedule {
        row: Option<Row>,
        reply: Sender<TableResult<()>>,
    },
    Load {
        date: NaiveDate,
        reply: Sender<TableResult<()>>,
    },
    NextTransactionId {
        reply: Sender<TransactionId>,
    },
    RowsInMonth {
        month: MonthCode,
        reply: Sender<Vec<Row>>,
    },
    BudgetFor {
        month: MonthCode,
        reply: Sender<Option<f64>>,
    },
    BalanceSeries {
        month: MonthCode,
        default_allowance: f64,
        reply: Sender<TableResult<Vec<BalancePoint>>>,
    },
    Shutdown,
}

/// Cloneable request handle for the worker thread.
#[derive(Clone)]
pub struct FinanceHandle {
    sender: Sender<FinanceCommand>,
}

/// Owner of the worker thread.
pub struct FinanceWorker {
    sender: Sender<FinanceCommand>,
    thread: JoinHandle<FinanceDatabase>,
}

/// Moves `database` onto a dedicated worker thread.
pub fn spawn_worker(database: FinanceDatabase) -> WorkerResult<(FinanceHandle, FinanceWorker)> {
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || run(database, receiver))
        .map_err(WorkerError::Spawn)?;

    info!("event=worker_start module=worker status=ok");
    Ok((
        FinanceHandle {
            sender: sender.clone(),
        },
        FinanceWorker { sender, thread },
    ))
}

impl FinanceWorker {
    /// Stops the worker after queued commands and returns the database.
    pub fn shutdown(self) -> WorkerResult<FinanceDatabase> {
        self.sender
            .send(FinanceCommand::Shutdown)
            .map_err(|_| WorkerError::Disconnected)?;
        let database = self.thread.join().map_err(|_| WorkerError::Disconnected)?;
        info!("event=worker_stop module=worker status=ok");
        Ok(database)
    }
}

impl FinanceHandle {
    /// Queues a raw command.
    pub fn send(&self, command: FinanceCommand) -> WorkerResult<()> {
        self.sender
            .send(command)
            .map_err(|_| WorkerError::Disconnected)
    }

    fn request<T, F>(&self, build: F) -> WorkerResult<T>
    where
        F: FnOnce(Sender<T>) -> FinanceCommand,
    {
        let (reply, response) = mpsc::channel();
        self.send(build(reply))?;
        response.recv().map_err(|_| WorkerError::Disconnected)
    }

    pub fn add_transaction(&self, row: Row) -> WorkerResult<()> {
        Ok(self.request(|reply| FinanceCommand::AddTransaction {
            row: Some(row),
            reply,
        })??)
    }

    pub fn record_transaction(
        &self,
        description: impl Into<String>,
        date: NaiveDate,
        amount: f64,
    ) -> WorkerResult<TransactionId> {
        let description = description.into();
        Ok(self.request(|reply| FinanceCommand::RecordTransaction {
            description,
            date,
            amount,
            reply,
        })??)
    }

    pub fn delete_transaction(&self, id: TransactionId) -> WorkerResult<CacheSync> {
        Ok(self.request(|reply| FinanceCommand::DeleteTransaction { id, reply })??)
    }

    pub fn update_transaction(
        &self,
        id: TransactionId,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> WorkerResult<CacheSync> {
        let column = column.into();
        let value = value.into();
        Ok(self.request(|reply| FinanceCommand::UpdateTransaction {
            id,
            column,
            value,
            reply,
        })??)
    }

    pub fn set_budget(&self, row: Row) -> WorkerResult<()> {
        Ok(self.request(|reply| FinanceCommand::SetBudget {
            row: Some(row),
            reply,
        })??)
    }

    pub fn add_schedule(&self, row: Row) -> WorkerResult<()> {
        Ok(self.request(|reply| FinanceCommand::AddSchedule {
            row: Some(row),
            reply,
        })??)
    }

    pub fn load(&self, date: NaiveDate) -> WorkerResult<()> {
        Ok(self.request(|reply| FinanceCommand::Load { date, reply })??)
    }

    pub fn next_transaction_id(&self) -> WorkerResult<TransactionId> {
        self.request(|reply| FinanceCommand::NextTransactionId { reply })
    }

    pub fn rows_in_month(&self, month: MonthCode) -> WorkerResult<Vec<Row>> {
        self.request(|reply| FinanceCommand::RowsInMonth { month, reply })
    }

    pub fn budget_for(&self, month: MonthCode) -> WorkerResult<Option<f64>> {
        self.request(|reply| FinanceCommand::BudgetFor { month, reply })
    }

    pub fn balance_series(
        &self,
        month: MonthCode,
        default_allowance: f64,
    ) -> WorkerResult<Vec<BalancePoint>> {
        Ok(self.request(|reply| FinanceCommand::BalanceSeries {
            month,
            default_allowance,
            reply,
        })??)
    }
}

fn run(mut database: FinanceDatabase, receiver: Receiver<FinanceCommand>) -> FinanceDatabase {
    // A dropped reply receiver only means the requester stopped waiting.
    while let Ok(command) = receiver.recv() {
        match command {
            FinanceCommand::AddTransaction { row, reply } => {
                let result = row
                    .ok_or(TableError::NullRow)
                    .and_then(|row| database.add_transaction(row));
                let _ = reply.send(result);
            }
            FinanceCommand::RecordTransaction {
                description,
                date,
                amount,
                reply,
            } => {
                let _ = reply.send(database.record_transaction(&description, date, amount));
            }
            FinanceCommand::DeleteTransaction { id, reply } => {
                let _ = reply.send(database.delete_transaction(id));
            }
            FinanceCommand::UpdateTransaction {
                id,
                column,
                value,
                reply,
            } => {
                let _ = reply.send(database.update_transaction(id, &column, &value));
            }
            FinanceCommand::SetBudget { row, reply } => {
                let result = row
                    .ok_or(TableError::NullRow)
                    .and_then(|row| database.set_budget(row));
                let _ = reply.send(result);
            }
            FinanceCommand::AddSchedule { row, reply } => {
                let result = row
                    .ok_or(TableError::NullRow)
                    .and_then(|row| database.add_schedule(row));
                let _ = reply.send(result);
            }
            FinanceCommand::Load { date, reply } => {
                let _ = reply.send(database.load(date));
            }
            FinanceCommand::NextTransactionId { reply } => {
                let _ = reply.send(database.next_transaction_id());
            }
            FinanceCommand::RowsInMonth { month, reply } => {
                let _ = reply.send(database.rows_in_month(month));
            }
            FinanceCommand::BudgetFor { month, reply } => {
                let _ = reply.send(database.budget_for(month));
            }
            FinanceCommand::BalanceSeries {
                month,
                default_allowance,
                reply,
            } => {
                let _ = reply.send(database.balance_series(month, default_allowance));
            }
            FinanceCommand::Shutdown => {
                debug!("event=worker_shutdown module=worker status=ok");
                break;
            }
        }
    }
    database
}
