//! Background pipeline jobs.
//!
//! [`JobRunner`] accepts message batches, runs them through a shared
//! [`Pipeline`] on the tokio runtime and keeps a queryable table of job
//! states. At most `max_concurrent` jobs run at once; the rest stay queued.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock, Semaphore};

use super::pipeline::{Pipeline, PipelineError, RunControl, Stage};
use crate::domain::{JobId, Message, Report};

/// Errors returned by job operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this id.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The job already reached a terminal state.
    #[error("job already finished: {0}")]
    Finished(JobId),
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Returns true once the job can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Snapshot of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub id: JobId,
    pub status: JobStatus,
    pub stage: Stage,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<Report>,
}

impl JobState {
    fn queued(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            stage: Stage::Queued,
            progress: 0,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            report: None,
        }
    }
}

struct JobEntry {
    state: JobState,
    control: RunControl,
    done: watch::Receiver<bool>,
}

impl JobEntry {
    /// State with live stage information for running jobs.
    fn snapshot(&self) -> JobState {
        let mut state = self.state.clone();
        if state.status == JobStatus::Processing {
            state.stage = self.control.stage();
            state.progress = state.stage.progress();
        }
        state
    }
}

/// How a job ended.
enum Outcome {
    Completed(Report),
    Failed(String),
    Cancelled(Stage),
}

type JobTable = Arc<RwLock<HashMap<JobId, JobEntry>>>;

/// Runs pipeline jobs in the background with bounded concurrency.
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    jobs: JobTable,
}

impl JobRunner {
    /// Creates a runner allowing `max_concurrent` simultaneous jobs.
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a runner using the pipeline's job settings.
    pub fn from_pipeline(pipeline: Arc<Pipeline>) -> Self {
        let max_concurrent = pipeline.settings().jobs.max_concurrent;
        Self::new(pipeline, max_concurrent)
    }

    /// Queues a batch of messages and returns the new job's id.
    pub async fn submit(&self, messages: Vec<Message>) -> JobId {
        let id = JobId::new();
        let control = RunControl::new();
        let (done_tx, done_rx) = watch::channel(false);

        self.jobs.write().await.insert(
            id.clone(),
            JobEntry {
                state: JobState::queued(id.clone()),
                control: control.clone(),
                done: done_rx,
            },
        );
        tracing::info!(job = %id, messages = messages.len(), "Job queued");

        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let jobs = Arc::clone(&self.jobs);
        let job_id = id.clone();

        tokio::spawn(async move {
            let outcome = execute(pipeline, permits, &jobs, &job_id, messages, control).await;
            finish(&jobs, &job_id, outcome).await;
            done_tx.send_replace(true);
        });

        id
    }

    /// Returns the current state of a job.
    pub async fn get(&self, id: &JobId) -> JobResult<JobState> {
        self.jobs
            .read()
            .await
            .get(id)
            .map(JobEntry::snapshot)
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Returns every known job, oldest first.
    pub async fn list(&self) -> Vec<JobState> {
        let mut states: Vec<JobState> = self
            .jobs
            .read()
            .await
            .values()
            .map(JobEntry::snapshot)
            .collect();
        states.sort_by_key(|s| s.created_at);
        states
    }

    /// Requests cancellation.
    ///
    /// Queued jobs never start; running jobs stop at the next stage boundary.
    pub async fn cancel(&self, id: &JobId) -> JobResult<()> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        if entry.state.status.is_terminal() {
            return Err(JobError::Finished(id.clone()));
        }
        entry.control.cancel();
        tracing::info!(job = %id, "Job cancellation requested");
        Ok(())
    }

    /// Waits until a job reaches a terminal state and returns it.
    pub async fn wait(&self, id: &JobId) -> JobResult<JobState> {
        let mut done = self
            .jobs
            .read()
            .await
            .get(id)
            .map(|entry| entry.done.clone())
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        if done.wait_for(|finished| *finished).await.is_err() {
            tracing::warn!(job = %id, "Job task ended without reporting");
        }
        self.get(id).await
    }

    /// Waits for several jobs at once.
    pub async fn wait_all(&self, ids: &[JobId]) -> Vec<JobResult<JobState>> {
        futures::future::join_all(ids.iter().map(|id| self.wait(id))).await
    }

    /// Drops finished jobs from the table and returns how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, entry| !entry.state.status.is_terminal());
        before - jobs.len()
    }
}

async fn execute(
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    jobs: &JobTable,
    id: &JobId,
    messages: Vec<Message>,
    control: RunControl,
) -> Outcome {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Outcome::Failed("job runner closed".to_string()),
    };
    if control.is_cancelled() {
        return Outcome::Cancelled(Stage::Queued);
    }

    if let Some(entry) = jobs.write().await.get_mut(id) {
        entry.state.status = JobStatus::Processing;
        entry.state.started_at = Some(Utc::now());
    }
    tracing::info!(job = %id, "Job started");

    // Run on its own task so a panic fails the job instead of losing it.
    let run = tokio::spawn(async move { pipeline.run(&messages, &control).await });
    match run.await {
        Ok(Ok(report)) => Outcome::Completed(report),
        Ok(Err(PipelineError::Cancelled(stage))) => Outcome::Cancelled(stage),
        Ok(Err(err)) => Outcome::Failed(err.to_string()),
        Err(err) => Outcome::Failed(format!("job task failed: {}", err)),
    }
}

async fn finish(jobs: &JobTable, id: &JobId, outcome: Outcome) {
    let mut jobs = jobs.write().await;
    let Some(entry) = jobs.get_mut(id) else {
        return;
    };
    let state = &mut entry.state;
    state.finished_at = Some(Utc::now());

    match outcome {
        Outcome::Completed(report) => {
            tracing::info!(job = %id, categories = report.categories.len(), "Job completed");
            state.status = JobStatus::Completed;
            state.stage = Stage::Completed;
            state.progress = 100;
            state.report = Some(report);
        }
        Outcome::Failed(error) => {
            tracing::error!(job = %id, "Job failed: {}", error);
            state.status = JobStatus::Failed;
            state.stage = entry.control.stage();
            state.progress = 100;
            state.error = Some(error);
        }
        Outcome::Cancelled(stage) => {
            tracing::info!(job = %id, %stage, "Job cancelled");
            state.status = JobStatus::Cancelled;
            state.stage = stage;
            state.progress = stage.progress();
        }
    }
}
