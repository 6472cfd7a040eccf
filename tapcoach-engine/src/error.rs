//! Error types for tapcoach-engine
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the practice engine
#[derive(Error, Debug)]
pub enum Error {
    /// Bootstrap configuration the engine cannot start with
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound session configuration rejected as a whole
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Errors surfaced from the common crate (frame parsing, bootstrap validation)
    #[error(transparent)]
    Common(#[from] tapcoach_common::Error),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
