use redis::IntoConnectionInfo;
use std::time::Duration;

/// Logical Redis databases backing each store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisDb {
    Transactions = 0,
    Queue = 1,
    Jobs = 2,
    Results = 3,
}

impl RedisDb {
    pub const ALL: [RedisDb; 4] = [
        RedisDb::Transactions,
        RedisDb::Queue,
        RedisDb::Jobs,
        RedisDb::Results,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RedisDb::Transactions => "transactions",
            RedisDb::Queue => "queue",
            RedisDb::Jobs => "jobs",
            RedisDb::Results => "results",
        }
    }
}

/// Open a client bound to one logical database of the Redis server at `redis_url`.
pub fn open_client(redis_url: &str, db: RedisDb) -> Result<redis::Client, redis::RedisError> {
    let mut info = redis_url.into_connection_info()?;
    info.redis.db = db as i64;
    redis::Client::open(info)
}

/// Check that the server answers `PING`.
pub async fn ping(client: &redis::Client) -> Result<(), redis::RedisError> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    redis::cmd("PING").query_async::<String>(&mut conn).await?;
    Ok(())
}

/// Block until Redis answers, retrying every `interval` up to `attempts` times.
pub async fn wait_until_ready(
    client: &redis::Client,
    attempts: u32,
    interval: Duration,
) -> Result<(), redis::RedisError> {
    let mut last_err = None;
    for attempt in 0..attempts {
        match ping(client).await {
            Ok(()) => {
                tracing::info!(attempt, "Redis is ready");
                return Ok(());
            }
            Err(e) => {
                if attempt % 10 == 0 {
                    tracing::info!(attempt, error = %e, "Waiting for Redis to become ready");
                }
                last_err = Some(e);
                tokio::time::sleep(interval).await;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        redis::RedisError::from((redis::ErrorKind::IoError, "Redis readiness check never ran"))
    }))
}
