//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for workspace operations
pub type Result<T> = std::result::Result<T, AnvisaError>;

/// Common error type for infrastructure-level failures
#[derive(Error, Debug)]
pub enum AnvisaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
