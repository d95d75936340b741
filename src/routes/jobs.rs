use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiResult, JobError};
use crate::models::submission::{JobStatusResponse, SubmitResponse, MISSING_BODY_MESSAGE};
use crate::services::submission::ResultLookup;

/// POST /jobs: Submit a graph-feature or transaction-batch job.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|_| JobError::Validation(MISSING_BODY_MESSAGE.to_string()))?;

    let job = state.submissions.submit(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

/// GET /jobs: Every job identifier, oldest first.
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<Uuid>>> {
    Ok(Json(state.submissions.list().await?))
}

/// DELETE /jobs: Remove all jobs and their results.
pub async fn clear_jobs(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.submissions.clear().await?;
    Ok(Json(json!({ "message": "All jobs and results deleted" })))
}

/// GET /jobs/{job_id}: Job status and payload.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.submissions.status(job_id).await?;
    Ok(Json(job.into()))
}

/// GET /results/{job_id}: Result of a completed job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = parse_job_id(&job_id)?;
    match state.submissions.result(job_id).await? {
        ResultLookup::NotFound => Err(JobError::job_not_found(job_id)),
        ResultLookup::NotReady(status) => Err(JobError::NotReady { job_id, status }),
        ResultLookup::Ready(result) => {
            let mut response =
                ([(header::CONTENT_TYPE, result.content_type)], result.blob).into_response();
            if let Some(filename) = result.filename {
                let disposition = format!("attachment; filename=\"{filename}\"");
                if let Ok(value) = disposition.parse::<HeaderValue>() {
                    response
                        .headers_mut()
                        .insert(header::CONTENT_DISPOSITION, value);
                }
            }
            Ok(response)
        }
    }
}

/// Identifiers that are not UUIDs can never have been issued.
fn parse_job_id(raw: &str) -> Result<Uuid, JobError> {
    Uuid::parse_str(raw).map_err(|_| JobError::NotFound(format!("Job {raw} not found")))
}
