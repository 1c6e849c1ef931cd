//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::middleware::security::GateError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Failures of audit export and other in-process operations
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// Application error types mapped onto HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    /// `reason` is only populated when the actor may see it
    #[error("Insufficient permission")]
    Forbidden { reason: Option<String> },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) | AppError::Server(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => AppError::Unauthenticated,
            GateError::Denied { reason, role, .. } => AppError::Forbidden {
                reason: role
                    .filter(|role| role.sees_deny_reasons())
                    .map(|_| reason.to_string()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message, details): (StatusCode, String, Option<JsonValue>) = match self {
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string(), None)
            },
            AppError::Forbidden { reason } => (
                StatusCode::FORBIDDEN,
                "Insufficient permission".to_string(),
                reason.map(|reason| json!({ "reason": reason })),
            ),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string(), None)
            },
            AppError::Server(ServerError::UnsupportedFormat(format)) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported export format: {}", format),
                None,
            ),
            AppError::Server(e) => {
                tracing::error!("Server error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string(), None)
            },
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
