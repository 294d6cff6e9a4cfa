//! API error handling.

use super::types::ErrorResponse;
use crate::error::BlattwerkError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

/// HTTP-facing error wrapper mapping domain errors to status codes.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request data (400).
    Validation(String),
    /// Content type outside the allow-list, or missing (415).
    UnsupportedMediaType(String),
    /// No job with the requested id (404).
    NotFound(Uuid),
    /// Anything else (500).
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(message) | ApiError::UnsupportedMediaType(message) | ApiError::Internal(message) => {
                message.clone()
            }
            ApiError::NotFound(id) => format!("No job with id {}", id),
        }
    }
}

impl From<BlattwerkError> for ApiError {
    fn from(error: BlattwerkError) -> Self {
        match error {
            BlattwerkError::Validation { message, .. } => ApiError::Validation(message),
            BlattwerkError::UnsupportedFormat(format) => {
                ApiError::UnsupportedMediaType(format!("Unsupported format: {}", format))
            }
            BlattwerkError::JobNotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error_type: self.error_type().to_string(),
            message: self.message(),
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
