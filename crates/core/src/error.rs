// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Phase;

/// Errors raised while reading or writing an archive container.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied accessing archive: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid or corrupt archive {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Writing {path} was interrupted")]
    Interrupted { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<(PathBuf, zip::result::ZipError)> for ArchiveError {
    fn from((path, err): (PathBuf, zip::result::ZipError)) -> Self {
        match err {
            zip::result::ZipError::Io(source) => Self::io(path, source),
            other => Self::corrupt(path, other),
        }
    }
}

/// Errors raised while browsing the comic library.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Comic not found: {name}")]
    ComicNotFound { name: String },

    #[error("Library directory not found: {path}")]
    LibraryDirNotFound { path: PathBuf },

    #[error("IO error reading library at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::LibraryDirNotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Everything that can stop a compile pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing to pack in {path}")]
    NothingToPack { path: PathBuf },

    #[error("Nested archives under {path} still remain after {limit} unpack passes")]
    NestingTooDeep { path: PathBuf, limit: usize },

    #[error("Compile cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map a directory-walk failure, blaming the entry it failed on.
    pub fn walk(root: &std::path::Path, err: walkdir::Error) -> Self {
        let path = err.path().unwrap_or(root).to_path_buf();
        Self::io(path, err.into())
    }
}

/// A pipeline failure, tagged with the phase it happened in.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct CompileFailure {
    pub stage: Phase,
    #[source]
    pub error: CompileError,
    /// Whether files from the failed run are still on disk.
    pub partial_artifacts: bool,
}

impl CompileFailure {
    pub fn new(stage: Phase, error: impl Into<CompileError>) -> Self {
        Self {
            stage,
            error: error.into(),
            partial_artifacts: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, CompileError::Cancelled)
    }
}
