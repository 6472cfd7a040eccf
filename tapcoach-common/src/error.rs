//! Common error types for TapCoach

use thiserror::Error;

/// Common result type for TapCoach operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across TapCoach crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound message was not a valid JSON record
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// TOML bootstrap file could not be decoded
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
