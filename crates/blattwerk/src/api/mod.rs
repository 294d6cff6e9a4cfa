//! REST API for the extraction pipeline.
//!
//! This module provides an Axum-based HTTP boundary around
//! [`ExtractionService`](crate::ExtractionService).
//!
//! # Endpoints
//!
//! - `POST /extraction` - Submit a document or archive (raw body, typed by
//!   the `Content-Type` header); returns 202 with the job id
//! - `GET /extraction/{id}` - Poll a job: 202 while in progress, 200 with
//!   the aggregated payload once done, 422 when failed, 404 when unknown
//! - `DELETE /extraction/{id}` - Remove a job record (idempotent)
//! - `GET /health` - Health check
//!
//! # cURL Examples
//!
//! ```bash
//! # Submit an archive with routing metadata
//! curl -X POST http://localhost:8000/extraction \
//!      -H "Content-Type: application/zip" \
//!      -H 'X-Meta-Info: {"batch": 7}' \
//!      -H "X-Notify-Destination: queue://scans" \
//!      --data-binary @scans.zip
//!
//! # Poll for the result
//! curl http://localhost:8000/extraction/<job_id> -o result.zip
//!
//! # Remove the job record
//! curl -X DELETE http://localhost:8000/extraction/<job_id>
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::ApiError;
pub use server::{create_router, create_router_with_limits, serve, serve_with_sink};
pub use types::{ApiSizeLimits, ApiState, ErrorResponse, HealthResponse, RemoveResponse, SubmitResponse};
