// 🏗️ Amount Parser Framework
// Three statement heuristics behind one trait, selected explicitly by config

use crate::currency::Currency;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Heuristic - which amount parser (and classification policy) runs
///
/// The three are NOT interchangeable: they encode different assumptions
/// about how a statement marks money in vs money out. Exactly one runs per
/// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// Optional symbol + signed number, classified by sign
    #[default]
    Signed,
    /// Symbol + grouped digits, largest amount is income
    Grouped,
    /// "Debit"/"Credit" labels in front of symbol amounts
    Labelled,
}

impl Heuristic {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            Heuristic::Signed => "Signed amounts",
            Heuristic::Grouped => "Grouped symbol amounts",
            Heuristic::Labelled => "Debit/Credit labels",
        }
    }

    /// Short code used in config files and on the command line
    pub fn code(&self) -> &str {
        match self {
            Heuristic::Signed => "signed",
            Heuristic::Grouped => "grouped",
            Heuristic::Labelled => "labelled",
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Heuristic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signed" => Ok(Heuristic::Signed),
            "grouped" => Ok(Heuristic::Grouped),
            "labelled" | "labeled" => Ok(Heuristic::Labelled),
            other => Err(format!("unknown heuristic: {}", other)),
        }
    }
}

/// MonetaryValue - one amount found in the statement text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonetaryValue {
    pub amount: f64,
    pub currency: Option<Currency>,
}

impl MonetaryValue {
    pub fn new(amount: f64, currency: Option<Currency>) -> Self {
        MonetaryValue { amount, currency }
    }
}

/// Extraction - output of parser.parse()
///
/// Values are kept in document order, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub values: Vec<MonetaryValue>,
    pub currency: Option<Currency>,
}

impl Extraction {
    pub fn amounts(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.amount).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// AmountParser - turns raw statement text into amounts + one currency
///
/// Candidates that fail to parse as numbers are skipped, never reported.
pub trait AmountParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Extraction>;

    /// Heuristic this parser implements
    fn heuristic(&self) -> Heuristic;

    /// Get parser version (for provenance in logs)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Get the parser for a heuristic
///
/// # Example:
/// ```
/// use statement_insights::{get_parser, Heuristic};
/// let parser = get_parser(Heuristic::Signed);
/// let extraction = parser.parse("Coffee $4.50").unwrap();
/// assert_eq!(extraction.amounts(), vec![4.5]);
/// ```
pub fn get_parser(heuristic: Heuristic) -> Box<dyn AmountParser> {
    match heuristic {
        Heuristic::Signed => Box::new(SignedAmountParser::new()),
        Heuristic::Grouped => Box::new(GroupedAmountParser::new()),
        Heuristic::Labelled => Box::new(LabelledAmountParser::new()),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

// ============================================================================
// SIGNED AMOUNTS
// ============================================================================

/// Optional symbol followed by a signed decimal: "₹100.00", "-50", "$-12.5"
///
/// Any bare number in the text counts, dates and reference numbers included.
/// Currency is the symbol of the first match that carried one.
pub struct SignedAmountParser;

impl SignedAmountParser {
    pub fn new() -> Self {
        SignedAmountParser
    }
}

impl Default for SignedAmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AmountParser for SignedAmountParser {
    fn parse(&self, text: &str) -> Result<Extraction> {
        let amount_re = Regex::new(&format!(r"({}?)(-?\d+\.?\d*)", Currency::SYMBOL_CLASS))?;

        let mut extraction = Extraction::default();

        for caps in amount_re.captures_iter(text) {
            let symbol = Currency::from_match(&caps[1]);
            if extraction.currency.is_none() {
                extraction.currency = symbol;
            }

            if let Some(amount) = parse_number(&caps[2]) {
                extraction.values.push(MonetaryValue::new(amount, symbol));
            }
        }

        Ok(extraction)
    }

    fn heuristic(&self) -> Heuristic {
        Heuristic::Signed
    }
}

// ============================================================================
// GROUPED SYMBOL AMOUNTS
// ============================================================================

/// Symbol followed by digits grouped in threes: "$12,500.75" parses as
/// 12500.75, while "₹1,25,000" stops at "₹1"
///
/// Currency is the first symbol anywhere in the text, even one that is not
/// attached to a kept amount.
pub struct GroupedAmountParser;

impl GroupedAmountParser {
    pub fn new() -> Self {
        GroupedAmountParser
    }
}

impl Default for GroupedAmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AmountParser for GroupedAmountParser {
    fn parse(&self, text: &str) -> Result<Extraction> {
        let amount_re = Regex::new(&format!(
            r"({})(\d{{1,3}}(?:,\d{{3}})+(?:\.\d+)?|\d+(?:\.\d+)?)",
            Currency::SYMBOL_CLASS
        ))?;

        let values = amount_re
            .captures_iter(text)
            .filter_map(|caps| {
                let symbol = Currency::from_match(&caps[1]);
                parse_number(&caps[2]).map(|amount| MonetaryValue::new(amount, symbol))
            })
            .collect();

        let currency = text.chars().find_map(Currency::from_symbol);

        Ok(Extraction { values, currency })
    }

    fn heuristic(&self) -> Heuristic {
        Heuristic::Grouped
    }
}

// ============================================================================
// DEBIT / CREDIT LABELS
// ============================================================================

/// "Debit ₹150.00" and "Credit: $1,000" on the same line
///
/// Debits are negated here so the sign rule applies downstream. Both label
/// kinds are collected in document order; currency comes from the first
/// amount parsed.
pub struct LabelledAmountParser;

impl LabelledAmountParser {
    pub fn new() -> Self {
        LabelledAmountParser
    }
}

impl Default for LabelledAmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AmountParser for LabelledAmountParser {
    fn parse(&self, text: &str) -> Result<Extraction> {
        let label_re = Regex::new(&format!(
            r"(Debit|Credit)[ \t]*[:\-]?[ \t]*({})[ \t]?(\d[\d,]*(?:\.\d+)?)",
            Currency::SYMBOL_CLASS
        ))?;

        let mut extraction = Extraction::default();

        for caps in label_re.captures_iter(text) {
            let Some(magnitude) = parse_number(&caps[3]) else {
                continue;
            };

            let amount = if &caps[1] == "Debit" { -magnitude } else { magnitude };
            let symbol = Currency::from_match(&caps[2]);

            if extraction.values.is_empty() {
                extraction.currency = symbol;
            }
            extraction.values.push(MonetaryValue::new(amount, symbol));
        }

        Ok(extraction)
    }

    fn heuristic(&self) -> Heuristic {
        Heuristic::Labelled
    }
}

// ============================================================================
// TESTS
// ============================================================================
