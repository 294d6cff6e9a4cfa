//! API request handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use super::error::ApiError;
use super::types::{ApiState, HealthResponse, RemoveResponse, SubmitResponse};
use crate::error::BlattwerkError;
use crate::formats::FileType;
use crate::types::{JobStatus, JobView, RequestContent};

const META_INFO_HEADER: &str = "x-meta-info";
const NOTIFY_DESTINATION_HEADER: &str = "x-notify-destination";

/// Submission endpoint handler.
///
/// POST /extraction
///
/// Accepts the raw document or archive as the request body. The
/// `Content-Type` header is validated against the format allow-list before
/// a job is created; optional `X-Meta-Info` and `X-Notify-Destination`
/// headers are carried on the job. Returns 202 with the new job id; the
/// extraction itself runs asynchronously.
pub async fn submit_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .trim();
    if content_type.is_empty() {
        return Err(ApiError::UnsupportedMediaType("Missing Content-Type header".into()));
    }
    let file_type = FileType::from_content_type(content_type)
        .ok_or_else(|| BlattwerkError::UnsupportedFormat(content_type.to_string()))?;

    let meta_info = headers.get(META_INFO_HEADER).and_then(|value| value.to_str().ok());
    let notify_destination = headers
        .get(NOTIFY_DESTINATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let job = state.service.prepare(meta_info, notify_destination)?;
    state
        .service
        .submit(job.id(), RequestContent::new(file_type, body.to_vec()))
        .await?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id: job.id() })))
}

/// Retrieval endpoint handler.
///
/// GET /extraction/{id}
///
/// - 404 when the id is unknown
/// - 202 with the job view while the job is in progress
/// - 200 with the aggregated payload and its MIME type once done
///   (or the job view when the job finished with nothing extracted)
/// - 422 with the job view when the job failed
pub async fn retrieve_handler(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let job = state.service.retrieve(id).ok_or(BlattwerkError::JobNotFound(id))?;

    let response = match job.status {
        JobStatus::InProgress => (StatusCode::ACCEPTED, Json(JobView::from(&job))).into_response(),
        JobStatus::Failed => (StatusCode::UNPROCESSABLE_ENTITY, Json(JobView::from(&job))).into_response(),
        JobStatus::Done => match (&job.aggregated_result, &job.response_type) {
            (Some(bytes), Some(mime)) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, mime.clone())], bytes.clone()).into_response()
            }
            _ => (StatusCode::OK, Json(JobView::from(&job))).into_response(),
        },
    };
    Ok(response)
}

/// Removal endpoint handler.
///
/// DELETE /extraction/{id}
///
/// Idempotent: removing an already-removed job reports `removed: false`.
pub async fn remove_handler(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Json<RemoveResponse> {
    Json(RemoveResponse {
        removed: state.service.discard(id),
    })
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
