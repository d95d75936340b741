pub mod data;
pub mod health;
pub mod help;
pub mod jobs;
pub mod metrics;

use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;

/// Every route except `/metrics`, which carries its own state.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/help", get(help::help))
        .route("/health", get(health::health_check))
        .route(
            "/data",
            get(data::get_data)
                .post(data::load_data)
                .delete(data::clear_data),
        )
        .route("/data/view", get(data::view_data))
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .post(jobs::submit_job)
                .delete(jobs::clear_jobs),
        )
        .route("/jobs/{job_id}", get(jobs::get_job))
        .route("/results/{job_id}", get(jobs::get_result))
        .with_state(state)
}
