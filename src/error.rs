//! Error types for floodgate.

use thiserror::Error;

/// Main error type for floodgate operations.
///
/// Rate limit checks themselves are total and never fail; only loading
/// configuration can produce an error.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
