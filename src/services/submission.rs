use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::JobError;
use crate::models::job::{Job, JobKind, JobPayload, JobStatus};
use crate::models::submission::parse_request;
use crate::services::queue::WorkQueue;
use crate::services::storage::{JobStore, ResultStore};

/// A finished job's output, ready to hand to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub content_type: &'static str,
    /// Download name, when the result is meant to be saved as a file.
    pub filename: Option<String>,
    pub blob: Vec<u8>,
}

/// Outcome of looking up a job's result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultLookup {
    NotFound,
    /// The job exists but has not completed.
    NotReady(JobStatus),
    Ready(JobResult),
}

/// Entry point for clients: creates jobs and answers status and result queries.
pub struct SubmissionService {
    jobs: Arc<dyn JobStore>,
    results: Arc<dyn ResultStore>,
    queue: Arc<dyn WorkQueue>,
}

impl SubmissionService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        results: Arc<dyn ResultStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            jobs,
            results,
            queue,
        }
    }

    /// Validate a raw request body and submit the job it describes.
    pub async fn submit(&self, body: &Value) -> Result<Job, JobError> {
        let payload = parse_request(body)?;
        self.submit_payload(payload).await
    }

    /// Persist a queued job (record and index entry together), then enqueue it.
    pub async fn submit_payload(&self, payload: JobPayload) -> Result<Job, JobError> {
        let job = Job::new(payload);
        self.jobs.create(&job).await?;

        if let Err(e) = self.queue.enqueue(job.id).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to enqueue job");
            self.abandon(&job).await;
            return Err(e.into());
        }

        metrics::counter!("fraud_jobs_submitted_total", "kind" => job.kind().to_string())
            .increment(1);
        tracing::info!(job_id = %job.id, kind = %job.kind(), "Job queued");
        Ok(job)
    }

    /// Mark a job that never reached the queue as failed, so it is not left queued forever.
    async fn abandon(&self, job: &Job) {
        let Ok(failed) = job.transition(JobStatus::Failed) else {
            return;
        };
        if let Err(e) = self.jobs.save(&failed, job.version).await {
            tracing::warn!(job_id = %job.id, error = %e, "Could not mark unqueued job as failed");
        }
    }

    pub async fn status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| JobError::job_not_found(job_id))
    }

    /// Every job identifier, oldest first.
    pub async fn list(&self) -> Result<Vec<Uuid>, JobError> {
        Ok(self.jobs.list_ids().await?)
    }

    /// Drop all jobs, the identifier index, and all results.
    pub async fn clear(&self) -> Result<(), JobError> {
        self.jobs.clear().await?;
        self.results.clear().await?;
        tracing::info!("Cleared all jobs and results");
        Ok(())
    }

    pub async fn result(&self, job_id: Uuid) -> Result<ResultLookup, JobError> {
        let Some(job) = self.jobs.get(job_id).await? else {
            return Ok(ResultLookup::NotFound);
        };
        if job.status != JobStatus::Completed {
            return Ok(ResultLookup::NotReady(job.status));
        }

        let blob = self.results.get(job_id).await?.ok_or_else(|| {
            JobError::Internal(format!("Job {job_id} is completed but has no stored result"))
        })?;

        Ok(ResultLookup::Ready(match job.kind() {
            JobKind::GraphFeature => JobResult {
                content_type: "image/png",
                filename: Some(format!("plot {job_id}.png")),
                blob,
            },
            JobKind::TransactionBatch => JobResult {
                content_type: "application/json",
                filename: None,
                blob,
            },
        }))
    }
}
