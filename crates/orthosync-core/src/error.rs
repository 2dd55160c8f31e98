//! Error types for orthosync-core
//!
//! Ordinary interaction sequences never produce errors: out-of-range indices
//! are clamped and calls without data are no-ops. The variants here cover
//! construction-time misconfiguration, volume loading and surface extraction.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for orthosync operations
pub type Result<T> = std::result::Result<T, OrthoError>;

/// Main error type for orthosync operations
#[derive(Error, Debug)]
pub enum OrthoError {
    /// A required collaborator was not supplied when building a view
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Volume loading failed; the previously published volume stays active
    #[error("Failed to load volume: {0}")]
    Load(String),

    /// Volume construction received inconsistent dimensions or buffers
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// The surface extraction collaborator failed
    #[error("Surface extraction failed: {0}")]
    Extraction(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
