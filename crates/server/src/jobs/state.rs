// crates/server/src/jobs/state.rs
//! State for a single compile job.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use comic_compiler_core::{CompileObserver, Phase, Progress};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::types::{JobId, JobProgress, JobStatus};

/// Mutable part of a job, always replaced under one lock so readers never
/// see a status from one update paired with progress from another.
#[derive(Debug, Clone)]
struct Snapshot {
    status: JobStatus,
    progress: Progress,
    output: Option<String>,
    error: Option<String>,
    finished_at: Option<Instant>,
}

/// State of one job, shared between its pipeline task and HTTP handlers.
pub struct JobState {
    id: JobId,
    comic: String,
    created_at: Instant,
    snapshot: RwLock<Snapshot>,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<JobProgress>,
}

impl JobState {
    pub fn new(id: JobId, comic: impl Into<String>) -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            id,
            comic: comic.into(),
            created_at: Instant::now(),
            snapshot: RwLock::new(Snapshot {
                status: JobStatus::Pending,
                progress: Progress::default(),
                output: None,
                error: None,
                finished_at: None,
            }),
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn comic(&self) -> &str {
        &self.comic
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(|e| {
            tracing::error!(job_id = %self.id, "RwLock poisoned reading job state");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(|e| {
            tracing::error!(job_id = %self.id, "RwLock poisoned writing job state");
            e.into_inner()
        })
    }

    /// Apply `f` unless the job already finished, then broadcast.
    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        let progress = {
            let mut guard = self.write();
            if guard.status.is_terminal() {
                return;
            }
            f(&mut *guard);
            if guard.status.is_terminal() {
                guard.finished_at = Some(Instant::now());
            }
            self.render(&*guard)
        };
        // No subscribers is fine.
        let _ = self.progress_tx.send(progress);
    }

    /// Transition the job to Running status.
    pub fn set_running(&self) {
        self.update(|s| s.status = JobStatus::Running);
    }

    /// Mark the job as done with the published file name.
    pub fn complete(&self, output: impl Into<String>) {
        let output = output.into();
        self.update(|s| {
            s.status = JobStatus::Done;
            s.output = Some(output);
        });
    }

    /// Mark the job as failed with an error message.
    pub fn fail(&self, error: impl Into<String>) {
        let error = error.into();
        self.update(|s| {
            s.status = JobStatus::Failed;
            s.error = Some(error);
        });
    }

    /// Mark the job as cancelled.
    pub fn mark_cancelled(&self) {
        self.update(|s| s.status = JobStatus::Cancelled);
    }

    /// Request cancellation; the pipeline stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn status(&self) -> JobStatus {
        self.read().status
    }

    pub fn is_finished(&self) -> bool {
        self.read().status.is_terminal()
    }

    /// When the job reached a terminal status.
    pub fn finished_at(&self) -> Option<Instant> {
        self.read().finished_at
    }

    /// Subscribe to progress updates for this specific job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.progress_tx.subscribe()
    }

    /// Get a snapshot of the current job state.
    pub fn snapshot(&self) -> JobProgress {
        self.render(&self.read())
    }

    fn render(&self, snapshot: &Snapshot) -> JobProgress {
        JobProgress {
            job_id: self.id.clone(),
            comic: self.comic.clone(),
            job_status: snapshot.status,
            job_progress: snapshot.progress,
            output: snapshot.output.clone(),
            error: snapshot.error.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl CompileObserver for JobState {
    fn phase_started(&self, phase: Phase) {
        tracing::info!(job_id = %self.id, comic = %self.comic, phase = %phase, "Compile phase started");
        self.update(|s| s.progress = Progress::start(phase));
    }

    fn completion(&self, fraction: f32) {
        self.update(|s| s.progress.completion = fraction);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
