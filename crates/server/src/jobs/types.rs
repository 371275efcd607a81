// crates/server/src/jobs/types.rs
//! Types for the compile job system.

use comic_compiler_core::Progress;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Opaque job token: a random UUID, also the name of the job's working directory.
pub type JobId = String;

/// Lifecycle status of a compile job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker slot.
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Handle to a started job, used for cancellation.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: JobId,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, cancel: CancellationToken) -> Self {
        Self { id, cancel }
    }

    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Snapshot of one job, as returned by the poll endpoint and sent over SSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: JobId,
    pub comic: String,
    pub job_status: JobStatus,
    pub job_progress: Progress,
    /// Published file name, once the job is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// `"<stage> failed: <cause>"` for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}
