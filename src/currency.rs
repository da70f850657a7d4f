// 💱 Currency & Formatter
// One dominant symbol per statement, amounts rendered to two decimals

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CURRENCY
// ============================================================================

/// Currency - the fixed set of symbols the parsers recognise
///
/// A statement carries at most one of these. When no symbol is found the
/// report holds `None` and amounts are rendered without a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Rupee,
    Euro,
    Pound,
    Dollar,
    Yen,
}

impl Currency {
    /// All recognised currencies, in the order they appear in patterns
    pub const ALL: [Currency; 5] = [
        Currency::Rupee,
        Currency::Euro,
        Currency::Pound,
        Currency::Dollar,
        Currency::Yen,
    ];

    /// Regex character class matching any recognised symbol
    pub const SYMBOL_CLASS: &'static str = "[₹€£$¥]";

    pub fn symbol(&self) -> char {
        match self {
            Currency::Rupee => '₹',
            Currency::Euro => '€',
            Currency::Pound => '£',
            Currency::Dollar => '$',
            Currency::Yen => '¥',
        }
    }

    /// ISO code for display in logs and the terminal summary
    pub fn code(&self) -> &str {
        match self {
            Currency::Rupee => "INR",
            Currency::Euro => "EUR",
            Currency::Pound => "GBP",
            Currency::Dollar => "USD",
            Currency::Yen => "JPY",
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Currency> {
        Currency::ALL.into_iter().find(|c| c.symbol() == symbol)
    }

    /// Parse the first character of a matched symbol group
    ///
    /// Empty strings (optional group not matched) map to `None`.
    pub fn from_match(text: &str) -> Option<Currency> {
        text.chars().next().and_then(Currency::from_symbol)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ============================================================================
// FORMATTER
// ============================================================================

/// Render an amount with two decimals and the currency prefix
///
/// # Examples:
/// ```
/// use statement_insights::{format_amount, Currency};
/// assert_eq!(format_amount(1000.0, Some(Currency::Rupee)), "₹1000.00");
/// assert_eq!(format_amount(12.5, None), "12.50");
/// ```
pub fn format_amount(amount: f64, currency: Option<Currency>) -> String {
    let mut digits = format!("{:.2}", amount);
    // -0.0 and tiny negatives round to "-0.00"
    if digits == "-0.00" {
        digits.remove(0);
    }

    match currency {
        Some(c) => format!("{}{}", c.symbol(), digits),
        None => digits,
    }
}
