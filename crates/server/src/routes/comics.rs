// crates/server/src/routes/comics.rs
//! Library browsing endpoints.
//!
//! - GET /comics - every comic in the library
//! - GET /comic-info?comic= - entries inside one comic's archive

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use comic_compiler_core::ComicFile;
use serde::Deserialize;

use super::{blocking, required};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ComicQuery {
    pub comic: Option<String>,
}

/// GET /api/comics - List library comics with human-readable sizes.
async fn list_comics(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ComicFile>>> {
    let comics = blocking(move || Ok(state.library().list_comics()?)).await?;
    Ok(Json(comics))
}

/// GET /api/comic-info - Entries of one comic, zero-size entries omitted.
async fn comic_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComicQuery>,
) -> ApiResult<Json<Vec<ComicFile>>> {
    let comic = required(query.comic, "comic")?;
    let entries = blocking(move || Ok(state.library().comic_info(&comic)?)).await?;
    Ok(Json(entries))
}

/// Build the comics router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comics", get(list_comics))
        .route("/comic-info", get(comic_info))
}
