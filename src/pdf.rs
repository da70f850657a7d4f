// 📄 PDF text extraction

use crate::error::{AnalysisError, Result};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// TextExtractor - file on disk to concatenated page text
///
/// Scanned or broken documents may yield empty or partial text; that is
/// not an error.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Production extractor backed by `pdf-extract`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        PdfTextExtractor
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        // pdf-extract panics on some malformed documents
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));

        match outcome {
            Ok(Ok(text)) => {
                debug!("Extracted {} chars from {}", text.len(), path.display());
                Ok(text)
            }
            Ok(Err(e)) => Err(AnalysisError::Extraction(e.to_string())),
            Err(_) => Err(AnalysisError::Extraction("PDF parser crashed".to_string())),
        }
    }
}

/// Is this filename acceptable as an upload?
///
/// Exact, case-sensitive `.pdf` suffix: `STATEMENT.PDF` is rejected.
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.ends_with(".pdf")
}
