// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use comic_compiler_core::CompileSettings;

/// Name of the published directory inside the library when none is given.
pub const DEFAULT_PUBLISHED_SUBDIR: &str = "compiled";

/// Name of the working directory inside the published directory.
pub const DEFAULT_WORK_SUBDIR: &str = ".work";

/// Comic compile service.
#[derive(Debug, Clone, Parser)]
#[command(name = "comic-compiler", version, about)]
pub struct Config {
    /// Root of the comic library (`<series>/<volume>/<comic>`).
    #[arg(long, env = "COMIC_LIBRARY_DIR", default_value = "/comics")]
    pub library_dir: PathBuf,

    /// Where compiled `.cbz` files are written [default: <library>/compiled].
    #[arg(long, env = "COMIC_PUBLISHED_DIR")]
    pub published_dir: Option<PathBuf>,

    /// Parent of per-job working directories [default: <published>/.work].
    #[arg(long, env = "COMIC_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, env = "COMIC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Origin allowed to call the API with credentials.
    #[arg(long, env = "COMIC_CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Compile jobs allowed to run at once; the rest wait as `pending`.
    #[arg(long, env = "COMIC_MAX_CONCURRENT_JOBS", default_value_t = 2)]
    pub max_concurrent_jobs: usize,

    /// Jobs kept in the registry before new requests are refused.
    #[arg(long, env = "COMIC_MAX_JOBS", default_value_t = 256)]
    pub max_jobs: usize,

    /// How long finished jobs stay queryable.
    #[arg(long, env = "COMIC_JOB_RETENTION_SECS", default_value_t = 3600)]
    pub job_retention_secs: u64,

    /// Maximum recursive unpack passes per compile.
    #[arg(long, env = "COMIC_MAX_NESTING", default_value_t = 16)]
    pub max_nesting: usize,
}

impl Config {
    /// Configuration rooted at `library_dir` with every other option at its default.
    pub fn for_library(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            published_dir: None,
            work_dir: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "http://localhost:5173".to_string(),
            max_concurrent_jobs: 2,
            max_jobs: 256,
            job_retention_secs: 3600,
            max_nesting: 16,
        }
    }

    pub fn published_dir(&self) -> PathBuf {
        self.published_dir
            .clone()
            .unwrap_or_else(|| self.library_dir.join(DEFAULT_PUBLISHED_SUBDIR))
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.published_dir().join(DEFAULT_WORK_SUBDIR))
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn compile_settings(&self) -> CompileSettings {
        CompileSettings {
            work_dir: self.work_dir(),
            published_dir: self.published_dir(),
            max_unpack_passes: self.max_nesting,
        }
    }

    /// The published directory, when it sits directly inside the library and
    /// must be hidden from library listings.
    pub fn library_exclusion(&self) -> Option<PathBuf> {
        let published = self.published_dir();
        (published.parent() == Some(self.library_dir.as_path())).then_some(published)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
