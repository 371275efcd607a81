// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use comic_compiler_core::LibraryError;
use serde::Serialize;
use thiserror::Error;

use crate::jobs::StartError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Published comic not found: {0}")]
    FileNotFound(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Too many jobs: {0}")]
    TooManyJobs(#[from] StartError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::FileNotFound(name) => {
                tracing::warn!(file = %name, "Published comic not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("File not found", format!("File: {}", name)),
                )
            }
            ApiError::Library(library_err) => {
                let (status, error_msg) = match library_err {
                    LibraryError::ComicNotFound { name } => {
                        tracing::warn!(comic = %name, "Comic not found");
                        (StatusCode::NOT_FOUND, "Comic not found")
                    }
                    LibraryError::LibraryDirNotFound { path } => {
                        tracing::error!(path = %path.display(), "Library directory not found");
                        (StatusCode::NOT_FOUND, "Library directory not found")
                    }
                    LibraryError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error reading library");
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO error reading library")
                    }
                };
                (
                    status,
                    ErrorResponse::with_details(error_msg, library_err.to_string()),
                )
            }
            ApiError::TooManyJobs(err) => {
                tracing::warn!(error = %err, "Rejecting compile request");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorResponse::with_details("Too many jobs", err.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
