//! Command-line front end for the finance tracker.
//!
//! Every database call goes through the single-owner worker handle.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use finance_core::model::date::parse_display_date;
use finance_core::table::budget::{AMOUNT_COLUMN, MONTH_COLUMN};
use finance_core::{
    init_logging, spawn_worker, CacheSync, DataPaths, FinanceDatabase, FinanceHandle, MonthCode,
    Row, Settings,
};
use log::{error, warn};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(
    name = "finance",
    version,
    about = "Track monthly spending against a budget"
)]
struct Cli {
    /// Database file; defaults to the last one opened
    #[arg(long, env = "FINANCE_TRACKER_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new database file and remember it
    Init {
        path: Option<PathBuf>,
    },
    /// Record a transaction
    Add {
        /// Date as DD/MM/YYYY
        #[arg(short, long)]
        date: String,
        #[arg(short = 'm', long)]
        description: String,
        /// Negative for spending
        #[arg(short, long, allow_hyphen_values = true)]
        amount: f64,
    },
    /// List the transactions of a month, newest first
    List {
        /// Month as MMYYYY; defaults to the current month
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Delete a transaction by id
    Delete { id: i64 },
    /// Change one column of a transaction
    Update {
        id: i64,
        column: String,
        value: String,
    },
    /// Set the allowance of a month
    Budget { month: String, amount: String },
    /// Show the running balance of a month
    Balance {
        #[arg(short, long)]
        month: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let paths = DataPaths::resolve()?;
    let mut settings = Settings::load(&paths)?;
    if let Err(err) = init_logging(&settings.log_level, paths.log_dir()) {
        eprintln!("warning: file logging disabled: {err}");
    }

    if let Commands::Init { path } = cli.command {
        let path = path.unwrap_or_else(|| paths.default_database_file());
        FinanceDatabase::create(&path)?;
        settings.remember_database(&paths, &path)?;
        println!("created {}", path.display());
        return Ok(());
    }

    let path = cli
        .database
        .or_else(|| settings.database_path.clone())
        .ok_or("no database selected; run `finance init` first")?;
    let database = FinanceDatabase::open(&path)
        .map_err(|err| format!("no connection to database {}: {err}", path.display()))?;
    if settings.database_path.as_ref() != Some(&path) {
        settings.remember_database(&paths, &path)?;
    }

    let (handle, worker) = spawn_worker(database)?;
    let outcome = dispatch(&handle, cli.command, &settings);
    let mut database = worker.shutdown()?;
    database.close();
    outcome
}

fn dispatch(handle: &FinanceHandle, command: Commands, settings: &Settings) -> CliResult<()> {
    match command {
        Commands::Init { .. } => Ok(()),
        Commands::Add {
            date,
            description,
            amount,
        } => {
            let date = parse_display_date(&date)
                .ok_or_else(|| format!("`{date}` is not a DD/MM/YYYY date"))?;
            load_month(handle, MonthCode::from_date(date))?;
            let id = handle.record_transaction(description, date, amount)?;
            println!("added transaction {id}");
            Ok(())
        }
        Commands::List { month } => {
            let month = month_or_current(month.as_deref())?;
            load_month(handle, month)?;
            let rows = handle.rows_in_month(month)?;
            if rows.is_empty() {
                println!("no transactions in {month}");
            }
            for row in rows {
                println!("{row}");
            }
            Ok(())
        }
        Commands::Delete { id } => {
            load_month(handle, current_month())?;
            match handle.delete_transaction(id)? {
                CacheSync::Missing => println!("no transaction {id}"),
                CacheSync::Applied | CacheSync::StoreOnly => println!("deleted transaction {id}"),
            }
            Ok(())
        }
        Commands::Update { id, column, value } => {
            load_month(handle, current_month())?;
            match handle.update_transaction(id, column, value)? {
                CacheSync::Missing => Err(format!("no transaction {id}").into()),
                CacheSync::Applied | CacheSync::StoreOnly => {
                    println!("updated transaction {id}");
                    Ok(())
                }
            }
        }
        Commands::Budget { month, amount } => {
            let code = parse_month(&month)?;
            load_month(handle, code)?;
            let row = Row::from_pairs([(MONTH_COLUMN, month), (AMOUNT_COLUMN, amount)])?;
            handle.set_budget(row)?;
            println!("budget for {code} set");
            Ok(())
        }
        Commands::Balance { month } => {
            let month = month_or_current(month.as_deref())?;
            load_month(handle, month)?;
            if handle.budget_for(month)?.is_none() {
                warn!("event=balance_default module=cli status=ok month={month}");
            }
            for point in handle.balance_series(month, settings.default_allowance)? {
                println!("{:>4} {:>10.2}", point.index, point.balance);
            }
            Ok(())
        }
    }
}

fn load_month(handle: &FinanceHandle, month: MonthCode) -> CliResult<()> {
    let first_day: NaiveDate = month
        .first_day()
        .ok_or_else(|| format!("month {month} is out of range"))?;
    handle.load(first_day)?;
    Ok(())
}

fn current_month() -> MonthCode {
    MonthCode::from_date(Local::now().date_naive())
}

fn month_or_current(month: Option<&str>) -> CliResult<MonthCode> {
    match month {
        Some(value) => parse_month(value),
        None => Ok(current_month()),
    }
}

fn parse_month(value: &str) -> CliResult<MonthCode> {
    Ok(MonthCode::parse(value).ok_or_else(|| format!("`{value}` is not an MMYYYY month"))?)
}
