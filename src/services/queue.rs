use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

const QUEUE_KEY: &str = "job_queue";

/// FIFO hand-off of job identifiers from submission to workers.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// Wait up to `wait` for the next identifier. Each identifier is delivered
    /// to exactly one caller.
    async fn dequeue(&self, wait: Duration) -> Result<Option<Uuid>, QueueError>;

    /// Number of identifiers waiting to be claimed.
    async fn depth(&self) -> Result<u64, QueueError>;
}

/// Redis list used as a FIFO: `LPUSH` on submit, `BRPOP` on consume.
pub struct RedisWorkQueue {
    client: redis::Client,
}

impl RedisWorkQueue {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, job_id.to_string()).await?;
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<Uuid>, QueueError> {
        // Dedicated connection: BRPOP holds it for the whole wait.
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> = conn.brpop(QUEUE_KEY, wait.as_secs_f64()).await?;

        match popped {
            Some((_, payload)) => {
                let job_id =
                    Uuid::parse_str(&payload).map_err(|_| QueueError::InvalidEntry(payload))?;
                Ok(Some(job_id))
            }
            None => Ok(None),
        }
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Queue entry is not a job identifier: {0}")]
    InvalidEntry(String),
}
