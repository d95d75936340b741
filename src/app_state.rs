use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{self, RedisDb};
use crate::services::{
    dataset::{DatasetError, DatasetLoader, RedisTransactionData, TransactionData},
    queue::RedisWorkQueue,
    storage::{RedisJobStore, RedisResultStore},
    submission::SubmissionService,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<SubmissionService>,
    pub data: Arc<dyn TransactionData>,
    pub loader: Arc<DatasetLoader>,
    /// Redis databases pinged by `/health`. Empty when running on in-memory backends.
    pub redis: Vec<(RedisDb, redis::Client)>,
}

impl AppState {
    pub fn new(
        submissions: SubmissionService,
        data: Arc<dyn TransactionData>,
        loader: DatasetLoader,
    ) -> Self {
        Self {
            submissions: Arc::new(submissions),
            data,
            loader: Arc::new(loader),
            redis: Vec::new(),
        }
    }

    /// Wire every store and the queue to its logical Redis database.
    pub fn connect(config: &AppConfig) -> Result<Self, StateError> {
        let client = |index: RedisDb| db::open_client(&config.redis_url, index);

        let jobs = RedisJobStore::new(client(RedisDb::Jobs)?);
        let results = RedisResultStore::new(client(RedisDb::Results)?);
        let queue = RedisWorkQueue::new(client(RedisDb::Queue)?);
        let data = RedisTransactionData::new(client(RedisDb::Transactions)?);

        let redis = vec![
            (RedisDb::Transactions, data.client().clone()),
            (RedisDb::Queue, queue.client().clone()),
            (RedisDb::Jobs, jobs.client().clone()),
            (RedisDb::Results, results.client().clone()),
        ];

        let loader = DatasetLoader::new(config.dataset_url.clone(), config.dataset_path.clone())?;
        let submissions =
            SubmissionService::new(Arc::new(jobs), Arc::new(results), Arc::new(queue));

        Ok(Self {
            redis,
            ..Self::new(submissions, Arc::new(data), loader)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid Redis configuration: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
