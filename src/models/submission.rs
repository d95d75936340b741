use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use strsim::jaro_winkler;
use uuid::Uuid;

use crate::models::job::{GraphFeature, Job, JobKind, JobPayload, JobStatus};
use crate::models::transaction::Transaction;

/// Minimum similarity for suggesting a supported feature name.
const SUGGESTION_THRESHOLD: f64 = 0.8;

pub const SINGLE_KEY_MESSAGE: &str =
    "JSON data params must be an object with a single key: \"graph_feature\" or \"transactions\".";

pub const MISSING_BODY_MESSAGE: &str =
    "JSON data params must be delivered in the body with the POST request.";

/// A malformed submission. User-correctable; no job is created.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Turn a submission body into a job payload.
///
/// Exactly one of `{"graph_feature": <name>}` or `{"transactions": [..]}` is accepted.
/// The whole request is rejected on the first violation.
pub fn parse_request(body: &Value) -> Result<JobPayload, ValidationError> {
    let object = body
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| ValidationError(SINGLE_KEY_MESSAGE.to_string()))?;

    if let Some(feature) = object.get("graph_feature") {
        return parse_graph_feature(feature).map(|feature| JobPayload::GraphFeature { feature });
    }
    if let Some(transactions) = object.get("transactions") {
        return parse_transactions(transactions)
            .map(|transactions| JobPayload::TransactionBatch { transactions });
    }
    Err(ValidationError(SINGLE_KEY_MESSAGE.to_string()))
}

fn parse_graph_feature(value: &Value) -> Result<GraphFeature, ValidationError> {
    let name = value.as_str().unwrap_or_default();
    GraphFeature::from_str(name).map_err(|_| {
        let allowed = GraphFeature::names();
        let mut message = format!(
            "JSON param \"graph_feature\" must be one of [{}]",
            allowed.join(", ")
        );
        if let Some(suggestion) = closest_feature(name, &allowed) {
            message.push_str(&format!(" (did you mean \"{suggestion}\"?)"));
        }
        ValidationError(message)
    })
}

fn closest_feature<'a>(name: &str, allowed: &'a [String]) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    let lowered = name.to_lowercase();
    allowed
        .iter()
        .map(|candidate| (candidate, jaro_winkler(&lowered, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.as_str())
}

fn parse_transactions(value: &Value) -> Result<Vec<Transaction>, ValidationError> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| {
            ValidationError(
                "JSON param \"transactions\" must be a non-empty list of transactions.".to_string(),
            )
        })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| Transaction::from_json(index, item).map_err(ValidationError))
        .collect()
}

/// Response after submitting a job.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Response for querying a job.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind(),
            status: job.status,
            payload: job.payload,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
