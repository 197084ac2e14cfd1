use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while exporting a query result to CSV.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The database file could not be opened
    #[error("failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Preparing or stepping the statement failed
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The statement would modify the database
    #[error("statement is not read-only: {0}")]
    NotReadOnly(String),

    /// The statement produces no result columns
    #[error("statement returns no columns: {0}")]
    NoColumns(String),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The finished temporary file could not be moved over the output path
    #[error("failed to persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
