// crates/server/src/jobs/runner.rs
//! Central job runner that owns the compile job registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use comic_compiler_core::CompileFailure;
use thiserror::Error;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::state::JobState;
use super::types::{JobHandle, JobId, JobProgress};

/// Why a job could not be started.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Job registry is full: {0} jobs are still unfinished")]
    Saturated(usize),
}

/// Registry limits.
#[derive(Debug, Clone, Copy)]
pub struct RunnerLimits {
    /// Jobs allowed to run at once.
    pub max_concurrent: usize,
    /// Registry capacity.
    pub max_jobs: usize,
    /// How long finished jobs stay in the registry.
    pub retention: Duration,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_jobs: 256,
            retention: Duration::from_secs(3600),
        }
    }
}

/// Central job runner that manages all compile jobs.
///
/// Call `start_job` to spawn work behind the concurrency limit, `get_job` to
/// poll, and `cancel` to request a stop.
pub struct JobRunner {
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
    permits: Arc<Semaphore>,
    limits: RunnerLimits,
}

impl JobRunner {
    pub fn new(limits: RunnerLimits) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(limits.max_concurrent.max(1))),
            limits,
        }
    }

    /// Register and spawn a new job for `comic`.
    ///
    /// The job stays `pending` until a worker slot frees up. `f` receives the
    /// job's state (its observer) and returns the published file name.
    pub fn start_job<F, Fut>(&self, comic: impl Into<String>, f: F) -> Result<JobHandle, StartError>
    where
        F: FnOnce(Arc<JobState>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, CompileFailure>> + Send + 'static,
    {
        let id: JobId = Uuid::new_v4().to_string();
        let state = Arc::new(JobState::new(id.clone(), comic));

        {
            let mut jobs = self.jobs.write().unwrap_or_else(|e| {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                e.into_inner()
            });
            self.evict(&mut jobs, Instant::now());
            if jobs.len() >= self.limits.max_jobs {
                tracing::warn!(jobs = jobs.len(), "Refusing compile: job registry saturated");
                return Err(StartError::Saturated(jobs.len()));
            }
            jobs.insert(id.clone(), Arc::clone(&state));
        }

        let permits = Arc::clone(&self.permits);
        let task_state = Arc::clone(&state);
        tokio::spawn(async move {
            let permit = tokio::select! {
                permit = permits.acquire_owned() => permit,
                _ = task_state.cancellation().cancelled() => {
                    task_state.mark_cancelled();
                    return;
                }
            };
            let Ok(_permit) = permit else {
                task_state.fail("Job runner is shutting down");
                return;
            };
            if task_state.cancellation().is_cancelled() {
                task_state.mark_cancelled();
                return;
            }

            task_state.set_running();
            match f(Arc::clone(&task_state)).await {
                Ok(output) => task_state.complete(output),
                Err(failure) if failure.is_cancelled() => task_state.mark_cancelled(),
                Err(failure) => task_state.fail(failure.to_string()),
            }
        });

        tracing::info!(job_id = %id, comic = %state.comic(), "Compile job queued");
        Ok(JobHandle::new(id, state.cancellation().clone()))
    }

    /// Drop expired finished jobs, then the oldest finished ones while the
    /// registry is at capacity. Unfinished jobs are never evicted.
    fn evict(&self, jobs: &mut HashMap<JobId, Arc<JobState>>, now: Instant) {
        let retention = self.limits.retention;
        jobs.retain(|_, job| match job.finished_at() {
            Some(finished) => now.saturating_duration_since(finished) < retention,
            None => true,
        });

        if jobs.len() < self.limits.max_jobs {
            return;
        }
        let mut finished: Vec<(Instant, JobId)> = jobs
            .iter()
            .filter_map(|(id, job)| job.finished_at().map(|at| (at, id.clone())))
            .collect();
        finished.sort();
        for (_, id) in finished {
            if jobs.len() < self.limits.max_jobs {
                break;
            }
            jobs.remove(&id);
        }
    }

    fn lookup(&self, id: &str) -> Option<Arc<JobState>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Shared state of a specific job, for streaming its updates.
    pub fn job_state(&self, id: &str) -> Option<Arc<JobState>> {
        self.lookup(id)
    }

    /// Get current status of a specific job.
    pub fn get_job(&self, id: &str) -> Option<JobProgress> {
        self.lookup(id).map(|s| s.snapshot())
    }

    /// Request cancellation of a job. Returns its snapshot after signalling.
    pub fn cancel(&self, id: &str) -> Option<JobProgress> {
        let state = self.lookup(id)?;
        if !state.is_finished() {
            tracing::info!(job_id = %id, "Cancelling compile job");
            state.cancel();
        }
        Some(state.snapshot())
    }

    /// Get all unfinished jobs.
    pub fn active_jobs(&self) -> Vec<JobProgress> {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .filter(|s| !s.is_finished())
                .map(|s| s.snapshot())
                .collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        }
    }

    /// Number of jobs currently held in the registry.
    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(RunnerLimits::default())
    }
}
