//! CLI error type.

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced to the terminal
#[derive(Debug, Error)]
pub enum CliError {
    /// Harness error
    #[error(transparent)]
    Lipi(#[from] lipi::LipiError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else
    #[error("{0}")]
    Generic(String),
}
