//! Crate-wide error type
//!
//! Classified backend failures live in [`crate::forecast::BackendError`] and never
//! surface through this type: they only drive the orchestrator's fallback chain.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to build or use the HTTP client
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to read a configuration file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed TOML configuration file
    #[error("Failed to parse configuration file: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The caller cancelled the request before a backend call started
    #[error("Orchestration cancelled before the next backend call")]
    Cancelled,

    /// REST API server failure
    #[error("Server error: {0}")]
    ServerError(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
