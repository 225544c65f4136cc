//! Error types shared across PrimerFlow crates

use thiserror::Error;

/// Result type alias for PrimerFlow operations
pub type Result<T> = std::result::Result<T, PrimerflowError>;

/// Top-level error type for PrimerFlow
#[derive(Error, Debug)]
pub enum PrimerflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PrimerflowError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
