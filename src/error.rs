// Error taxonomy for the analysis pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    // ------------------------------------------------------------------------
    // Validation - nothing saved, nothing extracted
    // ------------------------------------------------------------------------
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Only PDF files are allowed")]
    NotPdf { filename: String },

    // ------------------------------------------------------------------------
    // Processing - transient file is still removed
    // ------------------------------------------------------------------------
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read PDF text: {0}")]
    Extraction(String),

    #[error("invalid amount pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl AnalysisError {
    /// Validation failures are the user's to fix; everything else is ours
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingFile | AnalysisError::EmptyFilename | AnalysisError::NotPdf { .. }
        )
    }

    /// Message shown on the page
    pub fn user_message(&self) -> String {
        if self.is_validation() {
            self.to_string()
        } else {
            format!("Error processing file: {}", self)
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_shown_verbatim() {
        let err = AnalysisError::NotPdf { filename: "notes.txt".to_string() };
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Only PDF files are allowed");
    }

    #[test]
    fn test_processing_messages_are_prefixed() {
        let err = AnalysisError::Extraction("no xref table".to_string());
        assert!(!err.is_validation());
        assert_eq!(
            err.user_message(),
            "Error processing file: could not read PDF text: no xref table"
        );
    }
}
