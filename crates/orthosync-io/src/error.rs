//! I/O error types

use orthosync_core::OrthoError;
use thiserror::Error;

/// Errors that can occur while reading volume files
#[derive(Debug, Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to open file: {0}")]
    OpenFailed(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("File too short: expected {expected} bytes, got {actual}")]
    ShortFile { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Io(err.to_string())
    }
}

impl From<IoError> for OrthoError {
    fn from(err: IoError) -> Self {
        OrthoError::Load(err.to_string())
    }
}
