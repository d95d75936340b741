//! Test helper utilities: an in-memory application and request shortcuts

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use fraud_jobs::app_state::AppState;
use fraud_jobs::routes;
use fraud_jobs::services::artifacts::{ArtifactError, ArtifactProvider, ModelBundle};
use fraud_jobs::services::dataset::DatasetLoader;
use fraud_jobs::services::execution::JobExecutor;
use fraud_jobs::services::memory::{
    InMemoryJobStore, InMemoryResultStore, InMemoryTransactionData, InMemoryWorkQueue,
};
use fraud_jobs::services::queue::WorkQueue;
use fraud_jobs::services::submission::SubmissionService;
use fraud_jobs::services::worker::{JobOutcome, Worker, WorkerContext};

use crate::fixtures;

/// Artifact provider that always hands out the same bundle.
pub struct StaticArtifacts(pub ModelBundle);

#[async_trait]
impl ArtifactProvider for StaticArtifacts {
    async fn load(&self) -> Result<ModelBundle, ArtifactError> {
        Ok(self.0.clone())
    }
}

/// The whole pipeline wired to in-memory backends.
pub struct TestApp {
    pub submissions: Arc<SubmissionService>,
    pub ctx: WorkerContext,
    pub worker: Worker,
    pub jobs: Arc<InMemoryJobStore>,
    pub results: Arc<InMemoryResultStore>,
    pub queue: Arc<InMemoryWorkQueue>,
    pub data: Arc<InMemoryTransactionData>,
    pub router: Router,
}

/// Builds a [`TestApp`] with the fixture dataset and model unless told otherwise.
pub struct TestAppBuilder {
    artifacts: Arc<dyn ArtifactProvider>,
    dataset: Vec<fraud_jobs::models::dataset::DatasetRecord>,
    dataset_path: PathBuf,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            artifacts: Arc::new(StaticArtifacts(fixtures::model_bundle())),
            dataset: fixtures::dataset(),
            dataset_path: PathBuf::from("/nonexistent/fraud_test.csv"),
        }
    }

    pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactProvider>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn empty_dataset(mut self) -> Self {
        self.dataset = Vec::new();
        self
    }

    /// Local CSV served by `POST /data`.
    pub fn dataset_file(mut self, path: PathBuf) -> Self {
        self.dataset_path = path;
        self
    }

    pub fn build(self) -> TestApp {
        let jobs = Arc::new(InMemoryJobStore::new());
        let results = Arc::new(InMemoryResultStore::new());
        let queue = Arc::new(InMemoryWorkQueue::new());
        let data = Arc::new(InMemoryTransactionData::with_records(self.dataset));

        let submissions = SubmissionService::new(jobs.clone(), results.clone(), queue.clone());
        let ctx = WorkerContext {
            jobs: jobs.clone(),
            results: results.clone(),
            queue: queue.clone(),
            executor: Arc::new(JobExecutor::new(data.clone(), self.artifacts)),
        };
        let worker = Worker::new(0, ctx.clone(), Duration::from_millis(20));

        let loader = DatasetLoader::new(None, self.dataset_path).unwrap();
        let state = AppState::new(submissions, data.clone(), loader);
        let submissions = state.submissions.clone();
        let router = routes::api_router(state);

        TestApp {
            submissions,
            ctx,
            worker,
            jobs,
            results,
            queue,
            data,
            router,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        TestAppBuilder::new().build()
    }

    /// Pop the next queued identifier and process it, as one worker iteration does.
    pub async fn run_next_job(&self) -> Option<(Uuid, JobOutcome)> {
        let job_id = self.queue.dequeue(Duration::from_millis(50)).await.unwrap()?;
        Some((job_id, self.worker.process(job_id).await))
    }

    /// Send a request through the router.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.bytes)
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
