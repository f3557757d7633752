//! Error handling for the coderunner server.
//!
//! Every error is answered with a JSON body `{"success": false, "error": "<message>"}` and a
//! status code matching its kind:
//! - validation errors: 400
//! - exhausted execution capacity: 503
//! - unknown routes: 404
//! - everything else: 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coderunner_core::CoderunnerError;
use thiserror::Error;

use crate::payload::ErrorResponse;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a server operation
pub type ServerResult<T> = Result<T, ServerError>;

/// An error that occurred while serving a request
#[derive(pretty_error_debug::Debug, Error)]
pub enum ServerError {
    /// The request was malformed or violated a limit
    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    /// Every execution slot is busy and the wait queue is full
    #[error("{0}")]
    CapacityExhausted(String),

    /// The requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// The server configuration is unusable
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The server failed to carry out the request
    #[error("{0}")]
    InternalError(String),
}

/// Reasons a request is rejected
#[derive(pretty_error_debug::Debug, Error)]
pub enum ValidationError {
    /// `code` or `language` is missing from the body
    #[error("Missing required fields: code and language")]
    MissingFields,

    /// The language is not supported
    #[error("Invalid language. Must be python, java, or cpp")]
    InvalidLanguage,

    /// Any other invalid input
    #[error("{0}")]
    InvalidInput(String),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServerError {
    /// The status code the error is answered with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServerError::CapacityExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::ConfigError(_) | ServerError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

impl From<CoderunnerError> for ServerError {
    fn from(error: CoderunnerError) -> Self {
        match error {
            CoderunnerError::Validation(e) => {
                ServerError::ValidationError(ValidationError::InvalidInput(e.to_string()))
            }
            CoderunnerError::UnsupportedLanguage(_) => {
                ServerError::ValidationError(ValidationError::InvalidLanguage)
            }
            e @ CoderunnerError::CapacityExhausted { .. } => {
                ServerError::CapacityExhausted(e.to_string())
            }
            e => ServerError::InternalError(e.to_string()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
