//! Error types for the Influence cache layer

use std::time::Duration;
use thiserror::Error;

/// Result type alias for cache and resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Invalid entity id: {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a call to the upstream search API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream rejected the access token")]
    Unauthorized,

    #[error("Access denied by upstream search API")]
    Forbidden,

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("No client credentials configured for chain {0}")]
    MissingCredentials(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Network("Failed to connect to search API".to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// A single upstream hit that did not match the expected document shape.
///
/// Never aborts a batch: the resolver logs it and moves on to the next hit.
#[derive(Debug, Error)]
#[error("Malformed {index} hit: {reason}")]
pub struct ParseError {
    pub index: &'static str,
    pub reason: String,
}

impl ParseError {
    pub fn new(index: &'static str, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
