//! Error types for Keystone.

use thiserror::Error;

/// Result type alias using KeystoneError.
pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Errors that can occur in Keystone operations.
#[derive(Debug, Error)]
pub enum KeystoneError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    // Storage errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: i32 },

    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("Page size mismatch: expected {expected}, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
