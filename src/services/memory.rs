//! In-process implementations of the stores and queue.
//!
//! Behave like their Redis counterparts within a single process; used by the
//! test suites and for running the pipeline without a Redis server.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::models::dataset::DatasetRecord;
use crate::models::job::Job;
use crate::services::dataset::{DatasetError, TransactionData};
use crate::services::queue::{QueueError, WorkQueue};
use crate::services::storage::{JobStore, ResultStore, SaveOutcome, StoreError};

#[derive(Default)]
struct JobTable {
    records: HashMap<Uuid, Job>,
    index: Vec<Uuid>,
}

#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<JobTable>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut table = self.inner.lock().await;
        table.records.insert(job.id, job.clone());
        table.index.push(job.id);
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.lock().await.records.get(&job_id).cloned())
    }

    async fn save(&self, job: &Job, expected_version: u64) -> Result<SaveOutcome, StoreError> {
        let mut table = self.inner.lock().await;
        match table.records.get_mut(&job.id) {
            None => Ok(SaveOutcome::Missing),
            Some(stored) if stored.version != expected_version => Ok(SaveOutcome::Conflict),
            Some(stored) => {
                *stored = job.clone();
                Ok(SaveOutcome::Saved)
            }
        }
    }

    async fn list_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.inner.lock().await.index.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut table = self.inner.lock().await;
        table.records.clear();
        table.index.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    blobs: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put(&self, job_id: Uuid, blob: &[u8]) -> Result<(), StoreError> {
        self.blobs.lock().await.insert(job_id, blob.to_vec());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().await.get(&job_id).cloned())
    }

    async fn delete(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.blobs.lock().await.remove(&job_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.blobs.lock().await.clear();
        Ok(())
    }
}

/// FIFO queue; waiting consumers are woken one at a time.
#[derive(Default)]
pub struct InMemoryWorkQueue {
    items: Mutex<VecDeque<Uuid>>,
    available: Notify,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.items.lock().await.push_back(job_id);
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<Uuid>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(job_id) = self.items.lock().await.pop_front() {
                return Ok(Some(job_id));
            }
            if tokio::time::timeout_at(deadline, self.available.notified())
                .await
                .is_err()
            {
                return Ok(self.items.lock().await.pop_front());
            }
        }
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.items.lock().await.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryTransactionData {
    rows: Mutex<Vec<DatasetRecord>>,
}

impl InMemoryTransactionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DatasetRecord>) -> Self {
        Self {
            rows: Mutex::new(records),
        }
    }
}

#[async_trait]
impl TransactionData for InMemoryTransactionData {
    async fn get_all(&self) -> Result<Vec<DatasetRecord>, DatasetError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn view(&self, offset: usize, limit: usize) -> Result<Vec<DatasetRecord>, DatasetError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn len(&self) -> Result<usize, DatasetError> {
        Ok(self.rows.lock().await.len())
    }

    async fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), DatasetError> {
        *self.rows.lock().await = records.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatasetError> {
        self.rows.lock().await.clear();
        Ok(())
    }
}
