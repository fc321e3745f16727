//! Record and value types shared by the table layer.
//!
//! # Responsibility
//! - Define the `Row` record that mirrors one relational tuple.
//! - Own date and month-code conversions between display and storage forms.

pub mod date;
pub mod row;
