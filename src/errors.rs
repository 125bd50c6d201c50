/*!
 * Error types for the subsession application.
 *
 * This module contains custom error types for the provider layer and the
 * translation engine, using the thiserror crate for ergonomic error
 * definitions. Application layers wrap these in anyhow.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to a conversational provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Quota or rate limit exhausted for the current credential.
    /// This is the only provider error the engine retries.
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether this error is the transient rate-limit signal
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

/// Errors that can occur while translating one file
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Invalid engine setup, e.g. no credentials supplied
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The source subtitle file does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Every credential hit its quota
    #[error("All {total} API credentials have been exhausted")]
    AllCredentialsExhausted {
        /// Number of credentials that were tried
        total: usize,
    },

    /// Non-retryable error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Failure reading or writing the input, output or progress file
    #[error("File error: {0}")]
    File(String),
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
