//! Core error types for the desktop manager

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the desktop manager crates
#[derive(Error, Debug)]
pub enum DmError {
    /// Remote Job API error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single Job API call.
///
/// This is the only error kind the orchestrator distinguishes. Server error
/// bodies are kept for logging but never parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The call did not settle within the configured request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised while reading the configuration catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog keys must look like `facility|flavor`
    #[error("Invalid catalog key (expected facility|flavor): {0}")]
    InvalidKey(String),

    /// Catalog body is not valid JSON of the expected shape
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A launch default could not be read as an integer
    #[error("Invalid default {field}={value:?} in {key}")]
    InvalidDefault {
        key: String,
        field: &'static str,
        value: String,
    },
}
