// crates/server/src/routes/progress.rs
//! Compile job progress endpoints.
//!
//! - GET /comic-progress?job_id= - current snapshot
//! - GET /comic-progress/stream?job_id= - SSE stream of snapshots until the job ends
//! - POST /comic-cancel?job_id= - request cancellation

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::jobs::JobProgress;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub job_id: Option<String>,
}

fn progress_event(progress: &JobProgress) -> Event {
    let json = serde_json::to_string(progress).unwrap_or_default();
    Event::default().event("progress").data(json)
}

/// GET /api/comic-progress - Poll one job.
async fn get_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Json<JobProgress>> {
    let id = required(query.job_id, "job_id")?;
    state
        .jobs
        .get_job(&id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}

/// GET /api/comic-progress/stream - SSE stream of one job's snapshots.
///
/// Sends the current snapshot first, then every update, and closes after the
/// job reaches a terminal status.
async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let id = required(query.job_id, "job_id")?;
    let job = state
        .jobs
        .job_state(&id)
        .ok_or_else(|| ApiError::JobNotFound(id.clone()))?;

    // Subscribe before the first snapshot so no update falls in between.
    let mut rx = job.subscribe();
    let initial = job.snapshot();

    let stream = async_stream::stream! {
        let mut finished = initial.job_status.is_terminal();
        yield Ok(progress_event(&initial));

        while !finished {
            let progress = match rx.recv().await {
                Ok(progress) => progress,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(job_id = %id, skipped, "Progress stream lagged");
                    job.snapshot()
                }
                Err(RecvError::Closed) => break,
            };
            finished = progress.job_status.is_terminal();
            yield Ok(progress_event(&progress));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/comic-cancel - Ask a job to stop; returns its snapshot.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Json<JobProgress>> {
    let id = required(query.job_id, "job_id")?;
    state
        .jobs
        .cancel(&id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}

/// Build the progress router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comic-progress", get(get_progress))
        .route("/comic-progress/stream", get(stream_progress))
        .route("/comic-cancel", post(cancel_job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::routes::test_support::{app_for, get_json, send};
    use axum::http::StatusCode;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let dir = TempDir::new().unwrap();
        let (app, _state) = app_for(dir.path());

        let (status, json) = get_json(app.clone(), "/api/comic-progress?job_id=nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Job not found");

        let (status, _) = send(app.clone(), "POST", "/api/comic-cancel?job_id=nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, "GET", "/api/comic-progress/stream?job_id=nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_job_id_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (app, _state) = app_for(dir.path());
        let (status, _) = get_json(app, "/api/comic-progress").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_poll_reports_failure_for_unknown_comic() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app_for(dir.path());
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/compile-comic?comic=Missing.cbz",
            Some(r#"{"files":[]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let job_id = serde_json::from_slice::<serde_json::Value>(&body).unwrap()["job_id"]
            .as_str()
            .unwrap()
            .to_string();

        for _ in 0..200 {
            if state.jobs.get_job(&job_id).unwrap().job_status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let (status, json) = get_json(app, &format!("/api/comic-progress?job_id={job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["jobId"], job_id);
        assert_eq!(json["jobStatus"], "failed");
        assert_eq!(json["jobProgress"]["status"], "initializing");
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("initializing failed: Comic not found"));
    }

    #[tokio::test]
    async fn test_stream_of_finished_job_sends_one_event() {
        let dir = TempDir::new().unwrap();
        let (app, state) = app_for(dir.path());
        let handle = state
            .jobs
            .start_job("a.cbz", |_job| async move { Ok("a.cbz".to_string()) })
            .unwrap();
        for _ in 0..200 {
            if state.jobs.get_job(&handle.id).unwrap().job_status == JobStatus::Done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let (status, body) = send(
            app,
            "GET",
            &format!("/api/comic-progress/stream?job_id={}", handle.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.matches("event: progress").count(), 1);
        assert!(text.contains("\"jobStatus\":\"done\""));
    }
}
