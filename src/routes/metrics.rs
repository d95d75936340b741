use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics: Prometheus text exposition of job counters, execution times and queue depth.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the API and workers emit.
pub fn describe() {
    metrics::describe_counter!("fraud_jobs_submitted_total", "Total jobs accepted for processing");
    metrics::describe_counter!("fraud_jobs_completed_total", "Total jobs that completed");
    metrics::describe_counter!("fraud_jobs_failed_total", "Total jobs that failed");
    metrics::describe_histogram!(
        "fraud_job_execution_seconds",
        metrics::Unit::Seconds,
        "Time spent executing a job"
    );
    metrics::describe_gauge!(
        "fraud_jobs_queue_depth",
        "Job identifiers waiting in the work queue"
    );
}
