use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::models::submission::ValidationError;
use crate::services::dataset::DatasetError;
use crate::services::queue::QueueError;
use crate::services::storage::StoreError;

/// Errors surfaced synchronously to API callers.
///
/// Strategy failures never appear here: the worker records them as job state.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Malformed submission or query. No job was created.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The job exists but has no result to hand out yet.
    #[error("Job {job_id} is {status}; a result is only available once it is completed")]
    NotReady { job_id: Uuid, status: JobStatus },

    /// A store or the queue could not be reached.
    #[error("Service unavailable: {0}")]
    Infrastructure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, JobError>;

impl JobError {
    pub fn job_not_found(job_id: Uuid) -> Self {
        JobError::NotFound(format!("Job {job_id} not found"))
    }
}

impl From<ValidationError> for JobError {
    fn from(err: ValidationError) -> Self {
        JobError::Validation(err.0)
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Redis(e) => JobError::Infrastructure(e.to_string()),
            other => JobError::Internal(other.to_string()),
        }
    }
}

impl From<QueueError> for JobError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Redis(e) => JobError::Infrastructure(e.to_string()),
            other => JobError::Internal(other.to_string()),
        }
    }
}

impl From<DatasetError> for JobError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Redis(e) => JobError::Infrastructure(e.to_string()),
            other => JobError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            JobError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            JobError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            JobError::NotReady { .. } => (StatusCode::BAD_REQUEST, "NOT_READY", self.to_string()),
            JobError::Infrastructure(msg) => {
                tracing::error!(error = %msg, "Backing service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "A backing service is unavailable".to_string(),
                )
            }
            JobError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
