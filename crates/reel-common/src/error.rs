//! Error types for Reel

use thiserror::Error;

/// Result type alias for Reel operations
pub type Result<T> = std::result::Result<T, ReelError>;

/// Main error type for Reel
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported table: {0}")]
    UnsupportedTable(String),

    #[error("Invalid job status: {0}")]
    InvalidStatus(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
