// crates/server/src/lib.rs
//! Comic compile server library.
//!
//! This crate provides the Axum-based HTTP server that browses a comic
//! library, runs compile jobs in the background and serves their results.

pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// CORS for the configured front-end origin, with credentials.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS origin; cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (library, compile jobs, downloads)
/// - CORS for the configured origin
/// - Request tracing
pub fn create_app(config: &Config) -> Router {
    create_app_with_state(AppState::new(config), &config.cors_origin)
}

/// Like [`create_app`], over an existing state.
pub fn create_app_with_state(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .merge(api_routes(state))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}
