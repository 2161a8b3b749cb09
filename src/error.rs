//! Error types for httprec

use std::io;
use thiserror::Error;

/// Result type for httprec operations
pub type Result<T> = std::result::Result<T, HttprecError>;

/// Errors that can occur while recording or replaying fixtures
#[derive(Debug, Error)]
pub enum HttprecError {
    /// I/O error on a scenario, URL list or body file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Scenario file exists but is not valid scenario JSON
    #[error("Malformed scenario {path}: {source}")]
    Parse {
        /// File that failed to parse
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Scenario file not found
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),

    /// Network, DNS, TLS or timeout failure while talking to a live server
    #[error("Transport error: {0}")]
    Transport(String),

    /// A URL (usually a redirect `Location`) could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No recorded interaction for the request
    #[error("No recorded interaction for {method} {url}")]
    NotFound {
        /// Request method
        method: String,
        /// Request URL
        url: String,
    },

    /// A loaded fixture cannot be turned back into a response
    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid scenario name
    #[error("Invalid scenario name: {0}")]
    InvalidScenarioName(String),
}

impl HttprecError {
    /// True when replay found no recorded interaction
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
