// crates/server/src/routes/health.rs
//! Liveness of the compile service: library reachability and job load.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the library directory is missing.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub library_available: bool,
    /// Jobs that are pending or running.
    pub active_jobs: usize,
}

/// GET /api/health - Service status.
///
/// Always answers 200; a missing library only degrades the status so the
/// front-end can explain why browsing is empty.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let library_available = tokio::fs::metadata(state.library().root())
        .await
        .is_ok_and(|m| m.is_dir());
    Json(HealthResponse {
        status: if library_available { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        library_available,
        active_jobs: state.jobs.active_jobs().len(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
