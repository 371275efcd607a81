// crates/server/src/jobs/mod.rs
//! Background compile jobs.
//!
//! Provides:
//! - `JobRunner` - registry of jobs, bounded worker slots, eviction
//! - `JobState` - per-job snapshot under one lock, cancellation, updates
//! - `JobHandle` - cancellation handle
//! - `JobProgress` - poll/SSE snapshot

pub mod runner;
pub mod state;
pub mod types;

pub use runner::{JobRunner, RunnerLimits, StartError};
pub use state::JobState;
pub use types::{JobHandle, JobId, JobProgress, JobStatus};
