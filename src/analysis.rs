// 🔁 Analysis pipeline
// upload -> transient file -> text -> amounts -> classes -> aggregate report

use crate::aggregator::{aggregate, AggregateReport};
use crate::classifier::classify_extraction;
use crate::config::Config;
use crate::currency::Currency;
use crate::error::{AnalysisError, Result};
use crate::parser::{get_parser, Heuristic};
use crate::pdf::{has_pdf_extension, TextExtractor};
use crate::storage::UploadDir;
use log::info;
use std::io;
use std::sync::Arc;

/// Shown whenever a statement is read as dollars
pub const DOLLAR_NOTICE: &str =
    "Detected $ symbol. Assuming USD. For other currencies, please specify.";

/// Run parse -> classify -> aggregate over already-extracted text
///
/// Text without any amounts is not an error: it yields an all-zero report.
pub fn analyze_text(text: &str, heuristic: Heuristic, threshold: f64) -> Result<AggregateReport> {
    let parser = get_parser(heuristic);
    let extraction = parser.parse(text)?;
    let classified = classify_extraction(&extraction, heuristic);

    let mut report = aggregate(&classified, threshold, extraction.currency, heuristic);
    report.transaction_count = extraction.values.len();
    if extraction.currency == Some(Currency::Dollar) {
        report.notices.push(DOLLAR_NOTICE.to_string());
    }

    info!(
        "Analyzed {} chars with {} parser v{}: {} amounts, currency {}",
        text.len(),
        heuristic,
        parser.version(),
        extraction.values.len(),
        extraction.currency.map(|c| c.code().to_string()).unwrap_or_else(|| "unknown".to_string())
    );

    Ok(report)
}

/// Reject missing, unnamed, or non-PDF uploads before anything is saved
pub fn validate_upload_name(filename: Option<&str>) -> Result<&str> {
    let filename = filename.ok_or(AnalysisError::MissingFile)?;

    if filename.trim().is_empty() {
        return Err(AnalysisError::EmptyFilename);
    }
    if !has_pdf_extension(filename) {
        return Err(AnalysisError::NotPdf { filename: filename.to_string() });
    }

    Ok(filename)
}

// ============================================================================
// ANALYZER
// ============================================================================

/// Analyzer - the whole pipeline with its collaborators injected
#[derive(Clone)]
pub struct Analyzer {
    extractor: Arc<dyn TextExtractor>,
    uploads: UploadDir,
    heuristic: Heuristic,
    threshold: f64,
}

impl Analyzer {
    pub fn new(config: &Config, extractor: Arc<dyn TextExtractor>) -> io::Result<Self> {
        Ok(Analyzer {
            extractor,
            uploads: UploadDir::create(&config.upload_dir)?,
            heuristic: config.heuristic,
            threshold: config.large_expense_threshold,
        })
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn uploads(&self) -> &UploadDir {
        &self.uploads
    }

    /// Validate, save, extract, analyze. The saved file is gone on return.
    pub fn analyze_upload(&self, filename: Option<&str>, bytes: &[u8]) -> Result<AggregateReport> {
        let filename = validate_upload_name(filename)?;
        let file = self.uploads.save(filename, bytes)?;

        let text = self.extractor.extract_text(file.path())?;
        analyze_text(&text, self.heuristic, self.threshold)
    }
}
