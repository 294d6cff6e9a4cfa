//! API request and response types.

use crate::ExtractionService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// API server size limit configuration.
///
/// Applies to the whole request body; uploads beyond the limit are rejected
/// with HTTP 413. Default: 100 MB.
#[derive(Debug, Clone, Copy)]
pub struct ApiSizeLimits {
    /// Maximum size of the entire request body in bytes.
    pub max_request_body_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ApiSizeLimits {
    pub fn new(max_request_body_bytes: usize) -> Self {
        Self { max_request_body_bytes }
    }

    /// Create size limits from an MB value (convenience method).
    pub fn from_mb(max_request_body_mb: usize) -> Self {
        Self {
            max_request_body_bytes: max_request_body_mb * 1024 * 1024,
        }
    }
}

/// Response to a successful job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
}

/// Response to a job removal request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    /// False when there was nothing to remove.
    pub removed: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type name
    pub error_type: String,
    /// Error message
    pub message: String,
    /// HTTP status code
    pub status_code: u16,
}

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ExtractionService>,
}
