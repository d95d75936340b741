use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::{ApiResult, JobError};
use crate::models::dataset::DatasetRecord;

const DEFAULT_OFFSET: usize = 0;
const DEFAULT_LIMIT: usize = 5;

/// Raw query parameters of `/data/view`, parsed by hand so each problem gets its own message.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

/// POST /data: Load the dataset from its remote source, or the local fallback.
pub async fn load_data(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<Value>)> {
    let rows = state.loader.load_into(state.data.as_ref()).await?;
    tracing::info!(rows, "Transaction dataset loaded");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Transaction data loaded", "rows": rows })),
    ))
}

/// GET /data: Every dataset row.
pub async fn get_data(State(state): State<AppState>) -> ApiResult<Json<Vec<DatasetRecord>>> {
    Ok(Json(state.data.get_all().await?))
}

/// DELETE /data: Remove the dataset.
pub async fn clear_data(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.data.clear().await?;
    tracing::info!("Transaction dataset cleared");
    Ok(Json(json!({ "message": "Transaction data deleted" })))
}

/// GET /data/view?offset=&limit=: A slice of the dataset.
pub async fn view_data(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Json<Vec<DatasetRecord>>> {
    let limit = match params.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            JobError::Validation(
                "Optional limit parameter must be a valid positive integer.".to_string(),
            )
        })?,
    };
    let offset = match params.offset.as_deref() {
        None => DEFAULT_OFFSET,
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            JobError::Validation(
                "Optional offset parameter must be a valid nonnegative integer.".to_string(),
            )
        })?,
    };

    let len = state.data.len().await?;
    if offset >= len {
        return Err(JobError::Validation(
            "Optional offset parameter must be less than the length of the dataset.".to_string(),
        ));
    }
    if limit == 0 {
        return Err(JobError::Validation(
            "Optional limit parameter must be greater than zero.".to_string(),
        ));
    }

    Ok(Json(state.data.view(offset, limit).await?))
}
