//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`sd_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON body of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code (`validation_error`, `not_found`, ...).
    pub code: String,
    /// Underlying failure, present for storage and database errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub sd_core::Error);

impl From<sd_core::Error> for AppError {
    fn from(e: sd_core::Error) -> Self {
        Self(e)
    }
}

impl AppError {
    fn body(&self) -> ErrorResponse {
        use sd_core::Error;

        let (error, code, details) = match &self.0 {
            Error::Validation(msg) => (msg.clone(), "validation_error", None),
            Error::NotFound { .. } => (self.0.to_string(), "not_found", None),
            Error::Storage { .. } => (
                "Image storage operation failed".to_string(),
                "storage_error",
                Some(self.0.to_string()),
            ),
            Error::Database { .. } => (
                "Database operation failed".to_string(),
                "database_error",
                Some(self.0.to_string()),
            ),
            Error::Io { .. } => (self.0.to_string(), "io_error", None),
            Error::Internal(_) => (self.0.to_string(), "internal_error", None),
        };

        ErrorResponse {
            error,
            code: code.to_string(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        (status, axum::Json(self.body())).into_response()
    }
}
