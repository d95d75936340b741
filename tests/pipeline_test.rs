//! Submission, worker and result retrieval running end to end on in-memory backends

mod fixtures;
mod helpers;

use fixtures::*;
use helpers::*;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use fraud_jobs::error::JobError;
use fraud_jobs::models::job::JobStatus;
use async_trait::async_trait;
use fraud_jobs::services::artifacts::{ArtifactError, ArtifactProvider, FsArtifacts, ModelBundle};
use fraud_jobs::services::queue::WorkQueue;
use fraud_jobs::services::storage::{JobStore, ResultStore};
use fraud_jobs::services::submission::ResultLookup;
use fraud_jobs::services::vectorize::Vocabulary;
use fraud_jobs::services::worker::{JobOutcome, Worker};
use futures::future::join_all;
use std::time::Duration;

/// Hands out the fixture model only after the test releases it.
struct GatedArtifacts {
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

impl GatedArtifacts {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        })
    }
}

#[async_trait]
impl ArtifactProvider for GatedArtifacts {
    async fn load(&self) -> Result<ModelBundle, ArtifactError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(model_bundle())
    }
}

#[tokio::test]
async fn test_graph_job_lifecycle() {
    let app = TestApp::new();
    let job = app
        .submissions
        .submit(&json!({"graph_feature": "gender"}))
        .await
        .unwrap();

    // Queued: indexed exactly once, no result yet.
    let ids = app.submissions.list().await.unwrap();
    assert_eq!(ids.iter().filter(|id| **id == job.id).count(), 1);
    assert_eq!(
        app.submissions.status(job.id).await.unwrap().status,
        JobStatus::Queued
    );
    assert_eq!(
        app.submissions.result(job.id).await.unwrap(),
        ResultLookup::NotReady(JobStatus::Queued)
    );

    let (processed, outcome) = app.run_next_job().await.unwrap();
    assert_eq!(processed, job.id);
    assert_eq!(outcome, JobOutcome::Completed);

    let done = app.submissions.status(job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    // queued -> in_progress -> completed
    assert_eq!(done.version, 2);

    match app.submissions.result(job.id).await.unwrap() {
        ResultLookup::Ready(result) => {
            assert_eq!(result.content_type, "image/png");
            assert_eq!(
                image::guess_format(&result.blob).unwrap(),
                image::ImageFormat::Png
            );
        }
        other => panic!("expected a ready result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_every_feature_renders() {
    let app = TestApp::new();
    for feature in ["month", "day_of_week", "gender", "category", "trans_month", "trans_dayOfWeek"] {
        app.submissions
            .submit(&json!({ "graph_feature": feature }))
            .await
            .unwrap();
        let (_, outcome) = app.run_next_job().await.unwrap();
        assert_eq!(outcome, JobOutcome::Completed, "feature {feature}");
    }
}

#[tokio::test]
async fn test_single_transaction_gives_single_prediction() {
    let app = TestApp::new();
    let job = app
        .submissions
        .submit(&json!({"transactions": [transaction(12.5)]}))
        .await
        .unwrap();
    app.run_next_job().await.unwrap();

    match app.submissions.result(job.id).await.unwrap() {
        ResultLookup::Ready(result) => {
            assert_eq!(result.content_type, "application/json");
            let predictions: Vec<u8> = serde_json::from_slice(&result.blob).unwrap();
            assert_eq!(predictions.len(), 1);
            assert!(predictions[0] <= 1);
        }
        other => panic!("expected a ready result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_predictions_match_submission_order() {
    let app = TestApp::new();
    let amounts = [5.0, 950.0, 99.0, 101.5, 20.0, 3000.0];
    let transactions: Vec<_> = amounts.iter().map(|a| transaction(*a)).collect();
    let job = app
        .submissions
        .submit(&json!({ "transactions": transactions }))
        .await
        .unwrap();
    app.run_next_job().await.unwrap();

    let ResultLookup::Ready(result) = app.submissions.result(job.id).await.unwrap() else {
        panic!("result not ready");
    };
    let predictions: Vec<u8> = serde_json::from_slice(&result.blob).unwrap();
    let expected: Vec<u8> = amounts
        .iter()
        .map(|a| u8::from(*a as f32 > FRAUD_THRESHOLD))
        .collect();
    assert_eq!(predictions, expected);
}

#[tokio::test]
async fn test_invalid_feature_creates_no_job() {
    let app = TestApp::new();
    let err = app
        .submissions
        .submit(&json!({"graph_feature": "not_a_real_feature"}))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));
    assert!(app.submissions.list().await.unwrap().is_empty());
    assert_eq!(app.queue.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_batch_creates_no_job() {
    let app = TestApp::new();

    let mut missing_field = transaction(1.0);
    missing_field.as_object_mut().unwrap().remove("merch_long");
    let mut wrong_type = transaction(1.0);
    wrong_type["lat"] = json!("north");
    let mut extra_field = transaction(1.0);
    extra_field["zip"] = json!(29209);
    let mut bad_timestamp = transaction(1.0);
    bad_timestamp["trans_date_trans_time"] = json!("2020-06-21T12:14:00");

    for bad in [missing_field, wrong_type, extra_field, bad_timestamp] {
        let body = json!({ "transactions": [transaction(1.0), bad] });
        let err = app.submissions.submit(&body).await.unwrap_err();
        assert!(matches!(err, JobError::Validation(_)), "{err:?}");
    }
    assert!(app.submissions.list().await.unwrap().is_empty());
    assert_eq!(app.queue.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = TestApp::new();
    let never_issued = Uuid::new_v4();
    assert!(matches!(
        app.submissions.status(never_issued).await,
        Err(JobError::NotFound(_))
    ));
    assert_eq!(
        app.submissions.result(never_issued).await.unwrap(),
        ResultLookup::NotFound
    );
}

#[tokio::test]
async fn test_missing_artifacts_fail_the_job() {
    let empty = tempfile::tempdir().unwrap();
    let app = TestAppBuilder::new()
        .artifacts(Arc::new(FsArtifacts::new(empty.path())))
        .build();

    let job = app
        .submissions
        .submit(&json!({"transactions": [transaction(12.5)]}))
        .await
        .unwrap();
    let (_, outcome) = app.run_next_job().await.unwrap();
    assert_eq!(outcome, JobOutcome::Failed);

    assert_eq!(
        app.submissions.status(job.id).await.unwrap().status,
        JobStatus::Failed
    );
    assert!(app.results.get(job.id).await.unwrap().is_none());
    assert_eq!(
        app.submissions.result(job.id).await.unwrap(),
        ResultLookup::NotReady(JobStatus::Failed)
    );
}

#[tokio::test]
async fn test_artifacts_from_disk_classify() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let app = TestAppBuilder::new()
        .artifacts(Arc::new(FsArtifacts::new(dir.path())))
        .build();

    let job = app
        .submissions
        .submit(&json!({"transactions": [transaction(500.0), transaction(1.0)]}))
        .await
        .unwrap();
    app.run_next_job().await.unwrap();

    let ResultLookup::Ready(result) = app.submissions.result(job.id).await.unwrap() else {
        panic!("result not ready");
    };
    assert_eq!(serde_json::from_slice::<Vec<u8>>(&result.blob).unwrap(), vec![1, 0]);
}

#[tokio::test]
async fn test_graph_job_fails_without_dataset() {
    let app = TestAppBuilder::new().empty_dataset().build();
    let job = app
        .submissions
        .submit(&json!({"graph_feature": "category"}))
        .await
        .unwrap();
    let (_, outcome) = app.run_next_job().await.unwrap();
    assert_eq!(outcome, JobOutcome::Failed);
    assert!(app.results.get(job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_running_job_is_in_progress_without_result() {
    let gate = GatedArtifacts::new();
    let app = TestAppBuilder::new().artifacts(gate.clone()).build();
    let job = app
        .submissions
        .submit(&json!({"transactions": [transaction(7.0)]}))
        .await
        .unwrap();

    let observe = async {
        gate.entered.notified().await;
        let running = app.submissions.status(job.id).await.unwrap();
        let lookup = app.submissions.result(job.id).await.unwrap();
        gate.release.notify_one();
        (running, lookup)
    };
    let (processed, (running, lookup)) = tokio::join!(app.run_next_job(), observe);

    assert_eq!(running.status, JobStatus::InProgress);
    assert_eq!(running.version, 1);
    assert_eq!(lookup, ResultLookup::NotReady(JobStatus::InProgress));
    assert_eq!(processed.unwrap().1, JobOutcome::Completed);
    assert_eq!(
        app.submissions.status(job.id).await.unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_clear_during_execution_leaves_no_result() {
    let gate = GatedArtifacts::new();
    let app = TestAppBuilder::new().artifacts(gate.clone()).build();
    let job = app
        .submissions
        .submit(&json!({"transactions": [transaction(7.0)]}))
        .await
        .unwrap();

    let clear = async {
        gate.entered.notified().await;
        app.submissions.clear().await.unwrap();
        gate.release.notify_one();
    };
    let (processed, ()) = tokio::join!(app.run_next_job(), clear);

    assert_eq!(processed.unwrap().1, JobOutcome::Dropped);
    assert!(app.submissions.list().await.unwrap().is_empty());
    assert!(app.results.get(job.id).await.unwrap().is_none());
    assert_eq!(
        app.submissions.result(job.id).await.unwrap(),
        ResultLookup::NotFound
    );
}

#[tokio::test]
async fn test_status_reads_are_idempotent() {
    let app = TestApp::new();
    let job = app
        .submissions
        .submit(&json!({"graph_feature": "month"}))
        .await
        .unwrap();
    let first = app.submissions.status(job.id).await.unwrap();
    let second = app.submissions.status(job.id).await.unwrap();
    assert_eq!(first, second);

    app.run_next_job().await.unwrap();
    let first = app.submissions.status(job.id).await.unwrap();
    let second = app.submissions.status(job.id).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_redelivered_job_is_not_run_twice() {
    let app = TestApp::new();
    let job = app
        .submissions
        .submit(&json!({"graph_feature": "gender"}))
        .await
        .unwrap();
    app.run_next_job().await.unwrap();

    // At-least-once delivery: the same identifier shows up again.
    app.queue.enqueue(job.id).await.unwrap();
    let (_, outcome) = app.run_next_job().await.unwrap();
    assert_eq!(outcome, JobOutcome::Skipped);
    assert_eq!(
        app.jobs.get(job.id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_jobs_are_consumed_in_fifo_order() {
    let app = TestApp::new();
    let mut submitted = Vec::new();
    for feature in ["gender", "category", "month"] {
        let job = app
            .submissions
            .submit(&json!({ "graph_feature": feature }))
            .await
            .unwrap();
        submitted.push(job.id);
    }
    let mut processed = Vec::new();
    while let Some((job_id, _)) = app.run_next_job().await {
        processed.push(job_id);
    }
    assert_eq!(processed, submitted);
    assert_eq!(app.submissions.list().await.unwrap(), submitted);
}

#[tokio::test]
async fn test_concurrent_workers_run_each_job_once() {
    let app = TestApp::new();
    for _ in 0..12 {
        tokio_test::assert_ok!(
            app.submissions
                .submit(&json!({"graph_feature": "day_of_week"}))
                .await
        );
    }

    let workers: Vec<_> = (0..3)
        .map(|id| Worker::new(id, app.ctx.clone(), Duration::from_millis(20)))
        .collect();
    let runs = workers.iter().map(|worker| {
        let queue = app.queue.clone();
        async move {
            let mut outcomes = Vec::new();
            while let Some(job_id) = queue.dequeue(Duration::from_millis(50)).await.unwrap() {
                outcomes.push(worker.process(job_id).await);
            }
            outcomes
        }
    });
    let outcomes: Vec<JobOutcome> = join_all(runs).await.into_iter().flatten().collect();

    assert_eq!(outcomes.len(), 12);
    assert!(outcomes.iter().all(|o| *o == JobOutcome::Completed));
    for job_id in tokio_test::assert_ok!(app.submissions.list().await) {
        let job = app.jobs.get(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.version, 2);
        assert!(app.results.get(job_id).await.unwrap().is_some());
    }
}

#[test]
fn test_feature_rows_have_documented_width() {
    let bundle = model_bundle();
    let vocabulary: &Vocabulary = &bundle.vocabulary;
    let parsed: fraud_jobs::models::transaction::Transaction =
        serde_json::from_value(transaction(42.0)).unwrap();

    let first = vocabulary.feature_row(&parsed).unwrap();
    let again = vocabulary.feature_row(&parsed).unwrap();
    assert_eq!(first.len(), ROW_WIDTH);
    assert_eq!(first, again);
}
