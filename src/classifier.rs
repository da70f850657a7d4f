// 🏷️ Transaction Classifier
// Buckets extracted amounts into income and expense sets

use crate::parser::{Extraction, Heuristic};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLASSIFICATION POLICY
// ============================================================================

/// How a heuristic decides money in vs money out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationPolicy {
    /// value > 0 is income, value < 0 is an expense (kept as magnitude)
    Sign,
    /// First occurrence of the maximum is income, everything else is an
    /// expense summed as-is. Negative leftovers make total expense negative.
    Max,
}

impl ClassificationPolicy {
    pub fn for_heuristic(heuristic: Heuristic) -> Self {
        match heuristic {
            Heuristic::Signed | Heuristic::Labelled => ClassificationPolicy::Sign,
            Heuristic::Grouped => ClassificationPolicy::Max,
        }
    }
}

// ============================================================================
// CLASSIFIED TRANSACTIONS
// ============================================================================

/// Income and expense values ready for aggregation
///
/// `expenses` holds the values to be summed: magnitudes under the sign
/// policy, raw values under the max policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub income: Vec<f64>,
    pub expenses: Vec<f64>,
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.expenses.is_empty()
    }
}

pub fn classify(amounts: &[f64], policy: ClassificationPolicy) -> Classified {
    match policy {
        ClassificationPolicy::Sign => classify_by_sign(amounts),
        ClassificationPolicy::Max => classify_by_max(amounts),
    }
}

/// Classify an extraction with the policy its heuristic implies
pub fn classify_extraction(extraction: &Extraction, heuristic: Heuristic) -> Classified {
    classify(&extraction.amounts(), ClassificationPolicy::for_heuristic(heuristic))
}

fn classify_by_sign(amounts: &[f64]) -> Classified {
    let mut classified = Classified::default();

    for &amount in amounts {
        if amount > 0.0 {
            classified.income.push(amount);
        } else if amount < 0.0 {
            classified.expenses.push(amount.abs());
        }
    }

    classified
}

fn classify_by_max(amounts: &[f64]) -> Classified {
    let max_index = amounts
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &amount)| match best {
            Some((_, max)) if amount <= max => best,
            _ => Some((i, amount)),
        })
        .map(|(i, _)| i);

    let Some(max_index) = max_index else {
        return Classified::default();
    };

    Classified {
        income: vec![amounts[max_index]],
        expenses: amounts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != max_index)
            .map(|(_, &amount)| amount)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_policy_splits_by_sign_and_drops_zero() {
        let classified = classify(&[100.0, -20.0, 0.0, 5.5, -600.0], ClassificationPolicy::Sign);

        assert_eq!(classified.income, vec![100.0, 5.5]);
        assert_eq!(classified.expenses, vec![20.0, 600.0]);
    }

    #[test]
    fn test_max_policy_takes_first_maximum_as_income() {
        let classified = classify(&[50.0, 900.0, 20.0, 900.0], ClassificationPolicy::Max);

        assert_eq!(classified.income, vec![900.0]);
        assert_eq!(classified.expenses, vec![50.0, 20.0, 900.0]);
    }

    #[test]
    fn test_max_policy_keeps_negative_leftovers_as_is() {
        let classified = classify(&[-5.0, 10.0, -30.0], ClassificationPolicy::Max);

        assert_eq!(classified.income, vec![10.0]);
        assert_eq!(classified.expenses, vec![-5.0, -30.0]);
    }

    #[test]
    fn test_empty_sequence_is_empty_for_both_policies() {
        assert!(classify(&[], ClassificationPolicy::Sign).is_empty());
        assert!(classify(&[], ClassificationPolicy::Max).is_empty());
    }

    #[test]
    fn test_policy_for_each_heuristic() {
        assert_eq!(ClassificationPolicy::for_heuristic(Heuristic::Signed), ClassificationPolicy::Sign);
        assert_eq!(ClassificationPolicy::for_heuristic(Heuristic::Labelled), ClassificationPolicy::Sign);
        assert_eq!(ClassificationPolicy::for_heuristic(Heuristic::Grouped), ClassificationPolicy::Max);
    }
}
