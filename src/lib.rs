// Statement Insights - Core Library
// Exposes the analysis pipeline for the CLI, the web server, and tests

pub mod aggregator;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod currency;
pub mod error;
pub mod parser;
pub mod pdf;
pub mod report;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use aggregator::{aggregate, AggregateReport, Insight, DEFAULT_LARGE_EXPENSE_THRESHOLD};
pub use analysis::{analyze_text, validate_upload_name, Analyzer, DOLLAR_NOTICE};
pub use classifier::{classify, classify_extraction, ClassificationPolicy, Classified};
pub use config::Config;
pub use currency::{format_amount, Currency};
pub use error::AnalysisError;
pub use parser::{
    get_parser, AmountParser, Extraction, Heuristic, MonetaryValue,
    GroupedAmountParser, LabelledAmountParser, SignedAmountParser,
};
pub use pdf::{PdfTextExtractor, TextExtractor};
pub use report::{csv_filename, metric_rows, render_text, to_csv_bytes, write_csv, METRIC_LABELS};
pub use session::{InMemoryReportStore, ReportStore, SessionId};
pub use storage::{TransientFile, UploadDir};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
