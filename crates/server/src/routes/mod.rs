//! API route handlers for the comic compile server.

pub mod comics;
pub mod compile;
pub mod downloads;
pub mod health;
pub mod progress;

use std::sync::Arc;

use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/comics - List library comics
/// - GET  /api/comic-info?comic= - Entries inside one comic
/// - POST /api/compile-comic?comic= - Start a compile job
/// - GET  /api/comic-progress?job_id= - Poll a compile job
/// - GET  /api/comic-progress/stream?job_id= - SSE stream of one job
/// - POST /api/comic-cancel?job_id= - Cancel a compile job
/// - GET|POST /api/download-comic?comic= - Download a published comic
/// - GET  /api/downloadable-comics - List published comics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", comics::router())
        .nest("/api", compile::router())
        .nest("/api", progress::router())
        .nest("/api", downloads::router())
        .with_state(state)
}

/// A query parameter that must be present and non-empty.
pub(crate) fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("missing `{name}` query parameter"))),
    }
}

/// Run blocking filesystem work off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
