//! Orchestration over the finance tables.
//!
//! # Responsibility
//! - Own store and tables through one explicit context object.
//! - Serialize front-end requests through a single owner thread.
//! - Derive display data (running balance) from cached rows.

pub mod balance;
pub mod database;
pub mod worker;
