//! Error types for diario-dl
//!
//! A single `thiserror` enum covers the whole crate. Transient-vs-permanent
//! classification lives in [`crate::retry::IsRetryable`], next to the retry
//! loop that consumes it.

use thiserror::Error;

/// Result type alias for diario-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for diario-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_pages")
        key: Option<String>,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The service answered with a status that is neither success nor definitive absence
    #[error("unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    /// Boundary discovery hit an Indeterminate probe under the Abort policy
    #[error("discovery interrupted: existence probe exhausted retries without a definitive answer")]
    DiscoveryInterrupted,

    /// The landing page could not be parsed for edition metadata
    #[error("landing page error: {0}")]
    LandingPage(String),

    /// Assembling the output artifact from page files failed
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Shutdown in progress - not starting new work
    #[error("shutdown in progress: not starting new work")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Construct a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}
