//! Error types for stockpile-core

use thiserror::Error;

/// Result type alias using stockpile-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stockpile-core operations
///
/// These are infrastructure failures. Contract rejections on the write path
/// (not-found, permission, version conflict) are not errors; they are carried
/// by [`crate::engine::WriteOutcome`] so the precedence order stays auditable.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
