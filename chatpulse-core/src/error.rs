//! Error types for chatpulse-core

use thiserror::Error;

/// Main error type for the chatpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transcript bytes were not valid UTF-8
    #[error("transcript is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transcript pattern failed to compile
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for chatpulse-core
pub type Result<T> = std::result::Result<T, Error>;
