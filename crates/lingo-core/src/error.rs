use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for assistant operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while loading handlers, answering requests or escalating.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An answering provider encountered an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Provider returned a response that could not be interpreted.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// A handler could not be initialized; it stays absent from the registry.
    #[error("Failed to load handler {name}: {reason}")]
    HandlerLoad {
        /// Handler identifier
        name: String,
        /// Why initialization failed
        reason: String,
    },

    /// A handler failed while answering a request.
    #[error("{0}")]
    HandlerExecution(String),

    /// An operation exceeded its time budget.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient errors like network failures, provider errors or timeouts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Provider(_) | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::Config("invalid config".to_owned());
        assert_eq!(error1.to_string(), "Configuration error: invalid config");

        let error2 = Error::Provider("model failed".to_owned());
        assert_eq!(error2.to_string(), "Provider error: model failed");

        let error3 = Error::HandlerLoad {
            name: "weather".to_owned(),
            reason: "missing api key".to_owned(),
        };
        assert_eq!(
            error3.to_string(),
            "Failed to load handler weather: missing api key"
        );

        let error4 = Error::HandlerExecution("division by zero".to_owned());
        assert_eq!(error4.to_string(), "division by zero");
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::Provider("timeout".to_owned()).is_retryable());
        assert!(Error::Timeout(30_000).is_retryable());

        assert!(!Error::Config("bad config".to_owned()).is_retryable());
        assert!(!Error::MissingApiKey("KEY".to_owned()).is_retryable());
        assert!(!Error::HandlerExecution("boom".to_owned()).is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
