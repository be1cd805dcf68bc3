//! Error handling module for the boardd service.
//!
//! Maps workflow failures to HTTP status codes and the error response envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::boardd::BoarddError;
use crate::github::ForgeError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const REMOTE_API_ERROR: &str = "REMOTE_API_ERROR";
    pub const TRANSFER_ERROR: &str = "TRANSFER_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Actor may not mutate the target
    Forbidden(String),
    /// Validation error
    Validation(String),
    /// Stored record collection is malformed
    Parse(String),
    /// Version-control or pull-request call failed
    RemoteApi {
        message: String,
        operation: &'static str,
        status: Option<u16>,
    },
    /// Source picture download failed
    Transfer { message: String, url: String },
    /// Internal server error
    Internal(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RemoteApi { .. } => StatusCode::BAD_GATEWAY,
            AppError::Transfer { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Parse(_) => codes::PARSE_ERROR,
            AppError::RemoteApi { .. } => codes::REMOTE_API_ERROR,
            AppError::Transfer { .. } => codes::TRANSFER_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Forbidden(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Parse(msg) => msg.clone(),
            AppError::RemoteApi { message, .. } => message.clone(),
            AppError::Transfer { message, .. } => message.clone(),
            AppError::Internal(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::RemoteApi {
                operation, status, ..
            } => Some(serde_json::json!({ "operation": operation, "status": status })),
            AppError::Transfer { url, .. } => Some(serde_json::json!({ "url": url })),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<BoarddError> for AppError {
    fn from(err: BoarddError) -> Self {
        let message = err.to_string();
        match err {
            BoarddError::Permission(_) => AppError::Forbidden(message),
            BoarddError::Validation(_) => AppError::Validation(message),
            BoarddError::Parse { .. } => {
                tracing::error!("Stored collection is malformed: {}", message);
                AppError::Parse(message)
            }
            BoarddError::Remote(err) => err.into(),
            BoarddError::Transfer(err) => {
                tracing::error!("Picture download failed: {}", message);
                AppError::Transfer {
                    message,
                    url: err.url,
                }
            }
            BoarddError::OutOfOrder(_) => AppError::Internal(message),
        }
    }
}

impl From<ForgeError> for AppError {
    fn from(err: ForgeError) -> Self {
        tracing::error!("GitHub error: {:?}", err);
        AppError::RemoteApi {
            message: err.to_string(),
            operation: err.operation(),
            status: err.status(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details: error.details(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
