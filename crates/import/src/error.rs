use statera_core::ConfigError;
use thiserror::Error;

/// Conditions that abort a whole parse. Row-level problems are never errors;
/// they surface as [`crate::row::SkipReason`] instead.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unsupported statement format: '{filename}'")]
    UnsupportedFormat { filename: String },
    #[error("Header not found: {0}")]
    HeaderNotFound(String),
    #[error("Account number is required but was neither supplied nor detected")]
    MissingAccountNumber,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unknown charset: '{0}'")]
    UnknownCharset(String),
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Sheet {index} not found in workbook")]
    MissingSheet { index: usize },
    #[error("Document error: {0}")]
    Document(String),
}
