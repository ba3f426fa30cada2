/*!
 * HTTP error responses.
 *
 * Every failure leaves the server as `{"error": true, "message": "..."}`.
 * Internal details are logged and replaced with a generic message.
 */

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::errors::{AppError, ValidationError};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {message}")]
    TooManyRequests {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ServerError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::InvalidText(msg) | ValidationError::BadRequest(msg) => {
                ServerError::BadRequest(msg)
            }
            ValidationError::Duplicate(msg) | ValidationError::Conflict(msg) => {
                ServerError::Conflict(msg)
            }
            ValidationError::LimitReached(msg) => ServerError::TooManyRequests {
                message: msg,
                retry_after_secs: None,
            },
            ValidationError::NotFound(msg) => ServerError::NotFound(msg),
        }
    }
}

impl From<AppError> for ServerError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation(validation) => validation.into(),
            AppError::Provider(provider) => ServerError::ServiceUnavailable(provider.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(error: anyhow::Error) -> Self {
        AppError::from(error).into()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut retry_after = None;

        let message = match self {
            ServerError::Internal(detail) => {
                error!("Internal server error: {}", detail);
                "An internal error occurred".to_string()
            }
            ServerError::TooManyRequests {
                message,
                retry_after_secs,
            } => {
                retry_after = retry_after_secs;
                message
            }
            ServerError::BadRequest(msg)
            | ServerError::Unauthorized(msg)
            | ServerError::NotFound(msg)
            | ServerError::Conflict(msg)
            | ServerError::ServiceUnavailable(msg) => msg,
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
