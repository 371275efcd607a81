// crates/server/src/routes/downloads.rs
//! Published comic endpoints.
//!
//! - GET|POST /download-comic?comic= - the compiled `.cbz` as an attachment
//! - GET /downloadable-comics - compiled comics with human-readable sizes

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use comic_compiler_core::{published_comics, ComicFile};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::comics::ComicQuery;
use super::{blocking, required};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A published file name must be a bare name inside the published directory.
fn is_bare_file_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

/// GET|POST /api/download-comic - Serve a published comic.
///
/// Request headers are forwarded so range and conditional requests work.
async fn download_comic(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComicQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let name = required(query.comic, "comic")?;
    if !is_bare_file_name(&name) {
        return Err(ApiError::BadRequest(format!("invalid file name: {name}")));
    }
    let path = state.published_dir.join(&name);
    if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
        return Err(ApiError::FileNotFound(name));
    }

    // ServeFile only answers GET/HEAD, so POST downloads are replayed as GET.
    let mut request = Request::new(Body::empty());
    *request.headers_mut() = headers;
    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };

    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "_"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    tracing::info!(file = %name, "Serving published comic");
    Ok(response)
}

/// GET /api/downloadable-comics - List published `.cbz` files.
async fn list_downloadable(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ComicFile>>> {
    let dir = state.published_dir.clone();
    let comics = blocking(move || Ok(published_comics(&dir)?)).await?;
    Ok(Json(comics))
}

/// Build the downloads router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download-comic", get(download_comic).post(download_comic))
        .route("/downloadable-comics", get(list_downloadable))
}
