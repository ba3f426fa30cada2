/*!
 * Error types for the kikuyu-translate application.
 *
 * This module contains custom error types for the different layers of the
 * service, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
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
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider has no API key or endpoint configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether retrying later in the same batch is pointless
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationError(_) | ProviderError::NotConfigured(_)
        )
    }
}

/// User input that was rejected, carrying the message shown to the contributor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The submitted text failed a content rule
    #[error("{0}")]
    InvalidText(String),

    /// The same text already exists
    #[error("{0}")]
    Duplicate(String),

    /// A daily or hourly quota was reached
    #[error("{0}")]
    LimitReached(String),

    /// Referenced record does not exist
    #[error("{0}")]
    NotFound(String),

    /// The record is in a state that does not allow the request
    #[error("{0}")]
    Conflict(String),

    /// Unknown action or malformed request field
    #[error("{0}")]
    BadRequest(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from the database layer
    #[error("Database error: {0}")]
    Database(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Rejected user input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        // Keep validation failures typed when they travel through anyhow
        match error.downcast::<ValidationError>() {
            Ok(validation) => Self::Validation(validation),
            Err(error) => match error.downcast::<rusqlite::Error>() {
                Ok(db) => Self::Database(db.to_string()),
                Err(other) => Self::Unknown(format!("{:#}", other)),
            },
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}
