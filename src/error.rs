//! Error types for the abuse guard.

use thiserror::Error;

/// Main error type for abuse guard operations.
///
/// The counter and filter themselves never fail; these variants cover
/// loading configuration and word lists.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Invalid or unparsable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered settings could not be built or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Disallowed word list could not be parsed
    #[error("Word list error: {0}")]
    WordList(String),

    /// Unrecognized replay event line
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for abuse guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
