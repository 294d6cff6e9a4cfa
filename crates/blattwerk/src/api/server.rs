//! API server setup and configuration.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, remove_handler, retrieve_handler, submit_handler};
use super::types::{ApiSizeLimits, ApiState};
use crate::notify::{SharedSink, TracingSink};
use crate::{BlattwerkError, ExtractionService, Result, ServiceConfig};

/// Parse size limits from environment variables.
///
/// Reads `BLATTWERK_MAX_REQUEST_BODY_BYTES` (in bytes), then the legacy
/// `BLATTWERK_MAX_UPLOAD_SIZE_MB` (in MB). Falls back to the 100 MB default
/// when neither is set or the value is invalid.
fn parse_size_limits_from_env() -> ApiSizeLimits {
    parse_size_limits(
        std::env::var("BLATTWERK_MAX_REQUEST_BODY_BYTES").ok(),
        std::env::var("BLATTWERK_MAX_UPLOAD_SIZE_MB").ok(),
    )
}

fn parse_size_limits(body_bytes: Option<String>, upload_mb: Option<String>) -> ApiSizeLimits {
    if let Some(value) = body_bytes {
        match value.parse::<usize>() {
            Ok(bytes) if bytes > 0 => {
                tracing::info!("Upload size limit configured from environment: {} bytes", bytes);
                return ApiSizeLimits::new(bytes);
            }
            _ => {
                tracing::warn!(
                    "Failed to parse BLATTWERK_MAX_REQUEST_BODY_BYTES='{}', must be a positive integer",
                    value
                );
            }
        }
    }

    if let Some(value) = upload_mb {
        match value.parse::<usize>() {
            Ok(mb) if mb > 0 => {
                tracing::info!("Upload size limit configured from environment (legacy): {} MB", mb);
                return ApiSizeLimits::from_mb(mb);
            }
            _ => {
                tracing::warn!(
                    "Failed to parse BLATTWERK_MAX_UPLOAD_SIZE_MB='{}', must be a positive integer",
                    value
                );
            }
        }
    }

    let limits = ApiSizeLimits::default();
    tracing::info!(
        "Upload size limit: 100 MB (default, {} bytes) - configure with BLATTWERK_MAX_REQUEST_BODY_BYTES",
        limits.max_request_body_bytes
    );
    limits
}

/// Create the API router with all routes configured.
///
/// Public to allow embedding the router in a larger application:
///
/// ```no_run
/// use blattwerk::{api::create_router, ExtractionService, ServiceConfig, TracingSink};
/// use axum::Router;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let service = Arc::new(ExtractionService::new(&ServiceConfig::default(), Arc::new(TracingSink)));
/// let app = Router::new().nest("/api", create_router(service));
/// # }
/// ```
pub fn create_router(service: Arc<ExtractionService>) -> Router {
    create_router_with_limits(service, parse_size_limits_from_env())
}

/// Create the API router with explicit size limits.
pub fn create_router_with_limits(service: Arc<ExtractionService>, limits: ApiSizeLimits) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/extraction", post(submit_handler))
        .route("/extraction/{id}", get(retrieve_handler).delete(remove_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(limits.max_request_body_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server.
///
/// Builds an [`ExtractionService`] with the given worker-pool configuration
/// and the default logging notification sink.
///
/// ```no_run
/// use blattwerk::{api::serve, ServiceConfig};
///
/// #[tokio::main]
/// async fn main() -> blattwerk::Result<()> {
///     serve("127.0.0.1", 8000, ServiceConfig::default()).await
/// }
/// ```
pub async fn serve(host: impl AsRef<str>, port: u16, config: ServiceConfig) -> Result<()> {
    serve_with_sink(host, port, config, Arc::new(TracingSink)).await
}

/// Start the API server with a custom notification sink.
pub async fn serve_with_sink(host: impl AsRef<str>, port: u16, config: ServiceConfig, sink: SharedSink) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| BlattwerkError::validation(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);
    let service = Arc::new(ExtractionService::new(&config, sink));
    let app = create_router_with_limits(service, parse_size_limits_from_env());

    tracing::info!("Starting Blattwerk API server on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(BlattwerkError::Io)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| BlattwerkError::Other(e.to_string()))?;

    Ok(())
}
