// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use comic_compiler_core::{Compiler, Library};

use crate::config::Config;
use crate::jobs::{JobRunner, RunnerLimits};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Comic library and compile pipeline settings.
    pub compiler: Arc<Compiler>,
    /// Directory listed and served by the download routes.
    pub published_dir: PathBuf,
    /// Compile job registry.
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: &Config) -> Arc<Self> {
        let library = Library::new(&config.library_dir, config.library_exclusion());
        let compiler = Compiler::new(library, config.compile_settings());
        let jobs = JobRunner::new(RunnerLimits {
            max_concurrent: config.max_concurrent_jobs,
            max_jobs: config.max_jobs,
            retention: config.job_retention(),
        });
        Arc::new(Self {
            start_time: Instant::now(),
            compiler: Arc::new(compiler),
            published_dir: config.published_dir(),
            jobs: Arc::new(jobs),
        })
    }

    pub fn library(&self) -> &Library {
        self.compiler.library()
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_new() {
        let state = AppState::new(&Config::for_library("/data/comics"));
        assert_eq!(state.published_dir, PathBuf::from("/data/comics/compiled"));
        assert_eq!(state.library().root(), std::path::Path::new("/data/comics"));
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn test_app_state_uptime() {
        let state = AppState::new(&Config::for_library("/data/comics"));
        assert!(state.uptime_secs() < 5);
    }
}
