//! Worker loop: claim queued jobs, run them, record the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};
use crate::services::execution::JobExecutor;
use crate::services::queue::WorkQueue;
use crate::services::storage::{JobStore, ResultStore, SaveOutcome, StoreError};

/// Collaborators shared by every worker in a process.
#[derive(Clone)]
pub struct WorkerContext {
    pub jobs: Arc<dyn JobStore>,
    pub results: Arc<dyn ResultStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub executor: Arc<JobExecutor>,
}

/// What happened to one dequeued identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    /// Another consumer owns the job, or it is no longer queued.
    Skipped,
    /// No readable record exists for the identifier, or it was deleted mid-run.
    Dropped,
    /// Executed, but the terminal status could not be recorded.
    Unrecorded,
}

pub struct Worker {
    id: usize,
    ctx: WorkerContext,
    poll: Duration,
}

impl Worker {
    /// `poll` bounds each blocking dequeue, and so how long shutdown can take to be noticed.
    pub fn new(id: usize, ctx: WorkerContext, poll: Duration) -> Self {
        Self { id, ctx, poll }
    }

    /// Process jobs until `cancel` fires. A job already claimed is always
    /// finished before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker = self.id, "Worker started");

        while !cancel.is_cancelled() {
            match self.ctx.queue.dequeue(self.poll).await {
                Ok(Some(job_id)) => {
                    self.record_queue_depth().await;
                    self.process(job_id).await;
                }
                Ok(None) => tracing::trace!(worker = self.id, "No jobs available"),
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "Failed to read from work queue");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.poll) => {}
                    }
                }
            }
        }

        tracing::info!(worker = self.id, "Worker stopped");
    }

    /// Claim, execute and finish a single job.
    pub async fn process(&self, job_id: Uuid) -> JobOutcome {
        let job = match self.ctx.jobs.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::error!(worker = self.id, job_id = %job_id, "Dequeued job has no record");
                return JobOutcome::Dropped;
            }
            Err(e) => {
                tracing::error!(worker = self.id, job_id = %job_id, error = %e, "Failed to read job record");
                return JobOutcome::Dropped;
            }
        };

        let Ok(claimed) = job.transition(JobStatus::InProgress) else {
            tracing::warn!(
                worker = self.id,
                job_id = %job_id,
                status = %job.status,
                "Dequeued job is not queued, skipping"
            );
            return JobOutcome::Skipped;
        };

        // Version the terminal write is checked against.
        let stored_version = match self.ctx.jobs.save(&claimed, job.version).await {
            Ok(SaveOutcome::Saved) => claimed.version,
            Ok(SaveOutcome::Conflict) => {
                tracing::warn!(worker = self.id, job_id = %job_id, "Job claimed by another worker");
                return JobOutcome::Skipped;
            }
            Ok(SaveOutcome::Missing) => {
                tracing::error!(worker = self.id, job_id = %job_id, "Job record vanished before claim");
                return JobOutcome::Dropped;
            }
            Err(e) => {
                tracing::warn!(
                    worker = self.id,
                    job_id = %job_id,
                    error = %e,
                    "Claim write failed, checking stored record"
                );
                match self.reconcile_claim(&job, &claimed).await {
                    Ok(version) => version,
                    Err(outcome) => return outcome,
                }
            }
        };

        let kind = claimed.kind().to_string();
        tracing::info!(worker = self.id, job_id = %job_id, kind = %kind, "Processing job");

        let start = Instant::now();
        let execution = self.ctx.executor.execute(&claimed.payload).await;
        metrics::histogram!("fraud_job_execution_seconds", "kind" => kind.clone())
            .record(start.elapsed().as_secs_f64());

        let status = match execution {
            Ok(blob) => match self.ctx.results.put(job_id, &blob).await {
                Ok(()) => JobStatus::Completed,
                Err(e) => {
                    tracing::error!(worker = self.id, job_id = %job_id, error = %e, "Failed to store result");
                    JobStatus::Failed
                }
            },
            Err(e) => {
                tracing::error!(worker = self.id, job_id = %job_id, kind = %kind, error = %e, "Job execution failed");
                JobStatus::Failed
            }
        };

        match self.finish(&claimed, status, stored_version).await {
            Ok(SaveOutcome::Saved) => {}
            Ok(SaveOutcome::Missing) => {
                // Jobs were cleared while this one ran; its blob must not outlive it.
                tracing::warn!(worker = self.id, job_id = %job_id, "Job deleted while running, discarding result");
                if let Err(e) = self.ctx.results.delete(job_id).await {
                    tracing::error!(worker = self.id, job_id = %job_id, error = %e, "Failed to discard result");
                }
                return JobOutcome::Dropped;
            }
            Ok(SaveOutcome::Conflict) | Err(_) => {
                metrics::counter!("fraud_jobs_failed_total", "kind" => kind).increment(1);
                return JobOutcome::Unrecorded;
            }
        }

        match status {
            JobStatus::Completed => {
                metrics::counter!("fraud_jobs_completed_total", "kind" => kind).increment(1);
                JobOutcome::Completed
            }
            _ => {
                metrics::counter!("fraud_jobs_failed_total", "kind" => kind).increment(1);
                JobOutcome::Failed
            }
        }
    }

    /// Find out whether a claim whose write reported an error was applied.
    ///
    /// Returns the version the terminal write must expect, or the outcome to
    /// report when the job is no longer ours to run.
    async fn reconcile_claim(&self, job: &Job, claimed: &Job) -> Result<u64, JobOutcome> {
        match self.ctx.jobs.get(job.id).await {
            Ok(Some(stored)) if stored == *claimed => Ok(claimed.version),
            Ok(Some(stored)) if stored == *job => Ok(job.version),
            Ok(Some(stored)) => {
                tracing::warn!(
                    worker = self.id,
                    job_id = %job.id,
                    status = %stored.status,
                    "Job changed by another writer during claim"
                );
                Err(JobOutcome::Skipped)
            }
            Ok(None) => {
                tracing::error!(worker = self.id, job_id = %job.id, "Job record vanished during claim");
                Err(JobOutcome::Dropped)
            }
            Err(e) => {
                // Unknown; finish() re-checks on conflict.
                tracing::error!(worker = self.id, job_id = %job.id, error = %e, "Failed to re-read job record");
                Ok(job.version)
            }
        }
    }

    /// Write the terminal status from the in-memory snapshot, not a fresh read.
    ///
    /// A conflict caused by our own claim landing unseen is retried once against
    /// the claimed version.
    async fn finish(
        &self,
        claimed: &Job,
        status: JobStatus,
        stored_version: u64,
    ) -> Result<SaveOutcome, StoreError> {
        let terminal = match claimed.transition(status) {
            Ok(terminal) => terminal,
            Err(e) => {
                tracing::error!(worker = self.id, job_id = %claimed.id, error = %e, "Invalid terminal transition");
                return Ok(SaveOutcome::Conflict);
            }
        };

        let mut outcome = self.ctx.jobs.save(&terminal, stored_version).await;
        if matches!(outcome, Ok(SaveOutcome::Conflict)) && stored_version != claimed.version {
            if let Ok(Some(stored)) = self.ctx.jobs.get(claimed.id).await {
                if stored == *claimed {
                    outcome = self.ctx.jobs.save(&terminal, claimed.version).await;
                }
            }
        }

        match &outcome {
            Ok(SaveOutcome::Saved) => {
                tracing::info!(worker = self.id, job_id = %claimed.id, status = %status, "Job finished");
            }
            Ok(other) => {
                tracing::warn!(
                    worker = self.id,
                    job_id = %claimed.id,
                    outcome = ?other,
                    "Terminal status not written, record changed underneath"
                );
            }
            Err(e) => {
                tracing::error!(
                    worker = self.id,
                    job_id = %claimed.id,
                    status = %status,
                    error = %e,
                    "Failed to persist terminal status"
                );
            }
        }
        outcome
    }

    async fn record_queue_depth(&self) {
        if let Ok(depth) = self.ctx.queue.depth().await {
            metrics::gauge!("fraud_jobs_queue_depth").set(depth as f64);
        }
    }
}
