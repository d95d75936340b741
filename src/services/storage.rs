use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::job::Job;

/// Key of the ordered list of every job identifier ever created.
pub const JOB_IDS_KEY: &str = "job_ids";

/// Outcome of a version-guarded job write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored version differs from the expected one.
    Conflict,
    /// No record exists for the identifier.
    Missing,
}

/// Durable mapping from job identifier to job record, plus the identifier index.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new record and append its identifier to the index, atomically.
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Replace the stored record if its version still equals `expected_version`.
    async fn save(&self, job: &Job, expected_version: u64) -> Result<SaveOutcome, StoreError>;

    /// All identifiers in creation order.
    async fn list_ids(&self) -> Result<Vec<Uuid>, StoreError>;

    /// Drop every record and the index.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Durable mapping from job identifier to an opaque result blob.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn put(&self, job_id: Uuid, blob: &[u8]) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Vec<u8>>, StoreError>;

    async fn delete(&self, job_id: Uuid) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// Compare-and-set on the `version` field of a JSON job record.
/// Returns 1 when written, 0 on version mismatch, -1 when the key is absent.
const SAVE_IF_VERSION: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return -1
end
local stored = cjson.decode(current)['version']
if tonumber(stored) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

/// Redis-backed job store (one logical database; records keyed by identifier).
pub struct RedisJobStore {
    client: redis::Client,
    save_script: redis::Script,
}

impl RedisJobStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            save_script: redis::Script::new(SAVE_IF_VERSION),
        }
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let record = serde_json::to_string(job)?;
        let _: () = redis::pipe()
            .atomic()
            .set(job.id.to_string(), record)
            .ignore()
            .rpush(JOB_IDS_KEY, job.id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let record: Option<String> = conn.get(job_id.to_string()).await?;
        match record {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, job: &Job, expected_version: u64) -> Result<SaveOutcome, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let record = serde_json::to_string(job)?;
        let outcome: i64 = self
            .save_script
            .key(job.id.to_string())
            .arg(expected_version)
            .arg(record)
            .invoke_async(&mut conn)
            .await?;
        Ok(match outcome {
            1 => SaveOutcome::Saved,
            0 => SaveOutcome::Conflict,
            _ => SaveOutcome::Missing,
        })
    }

    async fn list_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ids: Vec<String> = conn.lrange(JOB_IDS_KEY, 0, -1).await?;
        ids.iter()
            .map(|id| Uuid::parse_str(id).map_err(|_| StoreError::CorruptIndex(id.clone())))
            .collect()
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// Redis-backed result store.
pub struct RedisResultStore {
    client: redis::Client,
}

impl RedisResultStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn put(&self, job_id: Uuid, blob: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(job_id.to_string(), blob).await?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let blob: Option<Vec<u8>> = conn.get(job_id.to_string()).await?;
        Ok(blob)
    }

    async fn delete(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(job_id.to_string()).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Job index holds an invalid identifier: {0}")]
    CorruptIndex(String),
}
