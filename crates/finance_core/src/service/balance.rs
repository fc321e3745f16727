//! Running-balance series for one month.
//!
//! The series backs the month chart: point `0` is the allowance, then one
//! point per transaction from oldest to newest.

use crate::table::cash_flow::Transaction;

/// Allowance used when the month has no budget row.
pub const DEFAULT_ALLOWANCE: f64 = 200.0;

/// One point of the running-balance series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancePoint {
    /// Transaction number within the month; `0` is the opening allowance.
    pub index: usize,
    /// Funds available after this transaction.
    pub balance: f64,
}

/// Builds the running balance from `allowance` and `transactions`.
///
/// `transactions` must be ordered oldest first.
pub fn running_balance(allowance: f64, transactions: &[Transaction]) -> Vec<BalancePoint> {
    let mut points = Vec::with_capacity(transactions.len() + 1);
    let mut balance = allowance;
    points.push(BalancePoint { index: 0, balance });
    for (offset, transaction) in transactions.iter().enumerate() {
        balance += transaction.amount;
        points.push(BalancePoint {
            index: offset + 1,
            balance,
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use super::{running_balance, BalancePoint};
    use crate::table::cash_flow::Transaction;
    use chrono::NaiveDate;

    fn transaction(id: i64, day: u32, amount: f64) -> Transaction {
        Transaction {
            id,
            description: format!("t{id}"),
            date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            amount,
        }
    }

    #[test]
    fn running_balance_starts_at_allowance_and_accumulates() {
        let points = running_balance(
            300.0,
            &[transaction(0, 1, -50.0), transaction(1, 3, 20.5), transaction(2, 9, -10.5)],
        );
        assert_eq!(
            points,
            vec![
                BalancePoint { index: 0, balance: 300.0 },
                BalancePoint { index: 1, balance: 250.0 },
                BalancePoint { index: 2, balance: 270.5 },
                BalancePoint { index: 3, balance: 260.0 },
            ]
        );
    }

    #[test]
    fn running_balance_of_empty_month_is_single_point() {
        assert_eq!(
            running_balance(200.0, &[]),
            vec![BalancePoint { index: 0, balance: 200.0 }]
        );
    }
}
