//! Error types for asset-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (network, filesystem, configuration)
//! - Context information (URL, file path, attempt counts)
//! - A crate-wide [`Result`] alias

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for asset-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for asset-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_workers")
        key: Option<String>,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// All retry attempts for a request were exhausted by transport failures
    #[error("request failed after {attempts} attempts: {url}")]
    RetriesExhausted {
        /// The URL that could not be fetched
        url: String,
        /// Number of attempts made (including the first)
        attempts: u32,
        /// The transport error from the final attempt
        #[source]
        source: reqwest::Error,
    },

    /// The upstream API answered with a non-success status where a payload
    /// was required (catalog listing)
    #[error("upstream returned status {status} for {url}")]
    UpstreamStatus {
        /// The URL that was requested
        url: String,
        /// The HTTP status code received
        status: u16,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A pasted URL could not be parsed into a catalog configuration
    #[error("invalid catalog URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as provided by the caller
        url: String,
        /// Why it was rejected (unparseable, missing parameters, unknown kind)
        reason: String,
    },

    /// A filesystem path could not be used as an output target
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path
        path: PathBuf,
        /// Why the path was rejected
        reason: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Config`] with a key
    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let err = Error::config("max_workers must be at least 1", "max_workers");
        assert_eq!(
            err.to_string(),
            "configuration error: max_workers must be at least 1"
        );
    }

    #[test]
    fn invalid_url_error_includes_url_and_reason() {
        let err = Error::InvalidUrl {
            url: "not a url".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not a url"));
        assert!(msg.contains("relative URL without a base"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
