//! Income, expense and balance totals for the dashboard.

use serde::Serialize;

use crate::transaction::{Transaction, TransactionKind};

/// How many transactions the dashboard lists as recent.
pub const RECENT_LIMIT: usize = 5;

/// The totals and recent activity shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardSummary {
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all expenses, as a positive number.
    pub total_expense: f64,
    /// Income minus expenses.
    pub total_balance: f64,
    /// Up to [RECENT_LIMIT] transactions, most recent first.
    pub recent: Vec<Transaction>,
}

/// Summarise `transactions`.
///
/// Amounts are summed without rounding. Transactions that occurred at the
/// same time keep their relative order in `recent`.
pub fn aggregate(transactions: &[Transaction]) -> DashboardSummary {
    let (total_income, total_expense) = transactions
        .iter()
        .fold((0.0, 0.0), |(income, expense), transaction| {
            match transaction.kind {
                TransactionKind::Income => (income + transaction.amount.value(), expense),
                TransactionKind::Expense => (income, expense + transaction.amount.value()),
            }
        });

    let mut recent = transactions.to_vec();
    recent.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    recent.truncate(RECENT_LIMIT);

    DashboardSummary {
        total_income,
        total_expense,
        total_balance: total_income - total_expense,
        recent,
    }
}
