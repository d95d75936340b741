use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::models::transaction::Transaction;

/// Status of an analysis job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Jobs only move forward: queued -> in_progress -> completed | failed.
    /// A queued job may also fail directly when it never reaches a worker.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::InProgress)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }
}

/// Dataset column a graph-feature job can break transactions down by.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, EnumIter, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GraphFeature {
    #[strum(to_string = "month", serialize = "trans_month")]
    Month,
    #[strum(to_string = "day_of_week", serialize = "trans_dayOfWeek")]
    DayOfWeek,
    Gender,
    Category,
}

impl GraphFeature {
    /// Canonical names, in the order they are advertised to clients.
    pub fn names() -> Vec<String> {
        GraphFeature::iter().map(|f| f.to_string()).collect()
    }
}

/// Work requested by a job. Fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum JobPayload {
    GraphFeature { feature: GraphFeature },
    TransactionBatch { transactions: Vec<Transaction> },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::GraphFeature { .. } => JobKind::GraphFeature,
            JobPayload::TransactionBatch { .. } => JobKind::TransactionBatch,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    GraphFeature,
    TransactionBatch,
}

/// An analysis job as persisted in the job store.
///
/// `version` increments on every status transition and guards writes with
/// compare-and-set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub version: u64,
    pub payload: JobPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            version: 0,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    /// Produce the next snapshot of this job in status `next`.
    pub fn transition(&self, next: JobStatus) -> Result<Job, InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(Job {
            status: next,
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Job cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}
