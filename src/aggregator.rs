// 📊 Aggregator - six metrics and one insight per statement
//
// Following the rule:
//   total_out == 0          -> "No money out detected"
//   any expense > threshold -> "Most money loss comes from a few large transactions"
//   otherwise               -> "Spending is mostly small daily expenses"

use crate::classifier::Classified;
use crate::currency::{format_amount, Currency};
use crate::parser::Heuristic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default large-expense threshold
pub const DEFAULT_LARGE_EXPENSE_THRESHOLD: f64 = 500.0;

// ============================================================================
// INSIGHT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insight {
    NoMoneyOut,
    LargeTransactions,
    SmallDailyExpenses,
}

impl Insight {
    pub fn derive(total_expense: f64, large_expense_count: usize) -> Self {
        if total_expense == 0.0 {
            Insight::NoMoneyOut
        } else if large_expense_count > 0 {
            Insight::LargeTransactions
        } else {
            Insight::SmallDailyExpenses
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Insight::NoMoneyOut => "No money out detected",
            Insight::LargeTransactions => "Most money loss comes from a few large transactions",
            Insight::SmallDailyExpenses => "Spending is mostly small daily expenses",
        }
    }
}

// ============================================================================
// AGGREGATE REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_income: f64,
    pub total_expense: f64,
    pub large_expense_count: usize,
    pub large_expense_sum: f64,
    pub small_expense_count: usize,
    pub small_expense_sum: f64,
    pub insight: Insight,
    pub currency: Option<Currency>,

    // Provenance
    pub heuristic: Heuristic,
    pub threshold: f64,
    pub transaction_count: usize,
    #[serde(default)]
    pub notices: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AggregateReport {
    pub fn expense_count(&self) -> usize {
        self.large_expense_count + self.small_expense_count
    }

    /// Format an amount in this report's currency
    pub fn format(&self, amount: f64) -> String {
        format_amount(amount, self.currency)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} amounts ({}): in {}, out {}, {} large / {} small - {}",
            self.transaction_count,
            self.heuristic,
            self.format(self.total_income),
            self.format(self.total_expense),
            self.large_expense_count,
            self.small_expense_count,
            self.insight.message()
        )
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

// Starts from +0.0; `Iterator::sum` on an empty f64 iterator yields -0.0
fn total(amounts: &[f64]) -> f64 {
    amounts.iter().fold(0.0, |acc, amount| acc + amount)
}

/// Aggregate classified values against a large-expense threshold
///
/// Pure: the same input always yields the same metrics. Only
/// `generated_at` differs between calls.
pub fn aggregate(
    classified: &Classified,
    threshold: f64,
    currency: Option<Currency>,
    heuristic: Heuristic,
) -> AggregateReport {
    let total_income = total(&classified.income);
    let total_expense = total(&classified.expenses);

    let (large, small): (Vec<f64>, Vec<f64>) = classified
        .expenses
        .iter()
        .partition(|amount| amount.abs() > threshold);

    let large_expense_sum = total(&large);
    let small_expense_sum = total(&small);

    AggregateReport {
        total_income,
        total_expense,
        large_expense_count: large.len(),
        large_expense_sum,
        small_expense_count: small.len(),
        small_expense_sum,
        insight: Insight::derive(total_expense, large.len()),
        currency,
        heuristic,
        threshold,
        transaction_count: classified.income.len() + classified.expenses.len(),
        notices: Vec::new(),
        generated_at: Utc::now(),
    }
}
