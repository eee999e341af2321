use thiserror::Error;

use crate::dialect::TranslationError;
use crate::migration::MigrationResult;

/// Error type for propdb operations
#[derive(Debug, Error)]
pub enum PropDbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database file {path} unavailable: {message}")]
    StorageUnavailable { path: String, message: String },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column} is not {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The CSV source could not be read; `partial` holds the rows handled before the failure.
    #[error("CSV stream failed: {message}")]
    Stream {
        message: String,
        partial: Box<MigrationResult>,
    },
}

/// Result type alias for propdb operations
pub type Result<T> = std::result::Result<T, PropDbError>;
