use fraud_jobs::{
    config::AppConfig,
    db::{self, RedisDb},
    routes,
    services::{
        artifacts::FsArtifacts,
        dataset::RedisTransactionData,
        execution::JobExecutor,
        queue::RedisWorkQueue,
        storage::{RedisJobStore, RedisResultStore},
        worker::{Worker, WorkerContext},
    },
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting fraud analysis worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Optional Prometheus listener for this process
    if let Some(addr) = &config.worker_metrics_addr {
        let addr: SocketAddr = addr.parse().expect("Invalid WORKER_METRICS_ADDR");
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .expect("Failed to start Prometheus exporter");
        routes::metrics::describe();
        tracing::info!(%addr, "Serving worker metrics");
    }

    // Connect to Redis
    tracing::info!("Connecting to Redis");
    let client = |index: RedisDb| {
        db::open_client(&config.redis_url, index).expect("Failed to create Redis client")
    };
    let jobs_client = client(RedisDb::Jobs);
    db::wait_until_ready(&jobs_client, 30, Duration::from_secs(1))
        .await
        .expect("Redis unreachable");

    let ctx = WorkerContext {
        jobs: Arc::new(RedisJobStore::new(jobs_client)),
        results: Arc::new(RedisResultStore::new(client(RedisDb::Results))),
        queue: Arc::new(RedisWorkQueue::new(client(RedisDb::Queue))),
        executor: Arc::new(JobExecutor::new(
            Arc::new(RedisTransactionData::new(client(RedisDb::Transactions))),
            Arc::new(FsArtifacts::new(config.artifacts_dir.clone())),
        )),
    };

    let cancel = CancellationToken::new();
    let poll = Duration::from_secs(config.queue_poll_secs.max(1));
    let count = config.worker_count.max(1);

    let handles: Vec<_> = (0..count)
        .map(|id| {
            let worker = Worker::new(id, ctx.clone(), poll);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        })
        .collect();

    tracing::info!(workers = count, "Workers ready, waiting for jobs");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, finishing in-flight jobs");
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker task ended abnormally");
        }
    }

    tracing::info!("All workers stopped");
}
