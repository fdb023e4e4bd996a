//! Error types for the Klaviyo client.

use thiserror::Error;

/// Result type for Klaviyo client operations.
pub type Result<T> = std::result::Result<T, KlaviyoError>;

/// Klaviyo client errors.
#[derive(Debug, Error)]
pub enum KlaviyoError {
    /// Non-2xx response. Carries the raw body for diagnostics.
    #[error("Klaviyo API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection failure, timeout, or other transport problem
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Response body did not match the expected JSON:API shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client could not be constructed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KlaviyoError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            KlaviyoError::Api { status, .. } => Some(*status),
            KlaviyoError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
