// crates/server/src/routes/compile.rs
//! POST /compile-comic - start a background compile job.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use comic_compiler_core::{CompileError, CompileFailure, CompileRequest, Phase};
use serde::{Deserialize, Serialize};

use super::comics::ComicQuery;
use super::required;
use crate::error::{ApiError, ApiResult};
use crate::jobs::JobId;
use crate::state::AppState;

/// Body of a compile request: the entries to extract; empty means all.
#[derive(Debug, Deserialize)]
pub struct CompileBody {
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompileStarted {
    pub job_id: JobId,
}

/// POST /api/compile-comic?comic= - Queue a compile and return its job token.
async fn compile_comic(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComicQuery>,
    body: Result<Json<CompileBody>, JsonRejection>,
) -> ApiResult<Json<CompileStarted>> {
    let comic = required(query.comic, "comic")?;
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = CompileRequest {
        comic: comic.clone(),
        files: body.files,
    };
    let compiler = Arc::clone(&state.compiler);
    let handle = state.jobs.start_job(comic, move |job| async move {
        tokio::task::spawn_blocking(move || {
            let token = job.id().to_string();
            compiler
                .compile(&request, &token, &*job)
                .map(|published| {
                    published
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                })
        })
        .await
        .unwrap_or_else(|e| {
            Err(CompileFailure::new(
                Phase::Initializing,
                CompileError::Internal(format!("compile task failed: {e}")),
            ))
        })
    })?;

    Ok(Json(CompileStarted { job_id: handle.id }))
}

/// Build the compile router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/compile-comic", post(compile_comic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app_for, send};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_comic_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (app, _state) = app_for(dir.path());
        let (status, _) = send(app, "POST", "/api/compile-comic", Some(r#"{"files":[]}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app_for(dir.path());
        let (status, _) = send(app, "POST", "/api/compile-comic?comic=a.cbz", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_returns_job_token() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app_for(dir.path());
        let (status, body) = send(
            app,
            "POST",
            "/api/compile-comic?comic=Missing.cbz",
            Some(r#"{"files":["page1.jpg"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let started: CompileStarted = serde_json::from_slice(&body).unwrap();
        assert_eq!(started.job_id.len(), 36);
        assert!(state.jobs.get_job(&started.job_id).is_some());
    }
}
