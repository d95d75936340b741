//! Shared transaction dataset: storage and population.
//!
//! The dataset lives in its own logical Redis database as an ordered list of
//! JSON rows. It is filled out-of-band from a remote CSV, falling back to a
//! local copy when the remote source is unavailable.

use async_trait::async_trait;
use redis::AsyncCommands;
use reqwest::Client;
use serde_json::{Map, Number, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::dataset::DatasetRecord;

const TRANSACTIONS_KEY: &str = "transactions";

/// Rows pushed per RPUSH while loading.
const LOAD_CHUNK: usize = 1000;

/// Backing store of the dataset used by graph-feature analysis.
#[async_trait]
pub trait TransactionData: Send + Sync {
    async fn get_all(&self) -> Result<Vec<DatasetRecord>, DatasetError>;

    async fn view(&self, offset: usize, limit: usize) -> Result<Vec<DatasetRecord>, DatasetError>;

    async fn len(&self) -> Result<usize, DatasetError>;

    /// Replace the whole dataset.
    async fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), DatasetError>;

    async fn clear(&self) -> Result<(), DatasetError>;
}

pub struct RedisTransactionData {
    client: redis::Client,
}

impl RedisTransactionData {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    fn decode(rows: Vec<String>) -> Result<Vec<DatasetRecord>, DatasetError> {
        rows.iter()
            .map(|row| serde_json::from_str(row).map_err(DatasetError::Row))
            .collect()
    }
}

#[async_trait]
impl TransactionData for RedisTransactionData {
    async fn get_all(&self) -> Result<Vec<DatasetRecord>, DatasetError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let rows: Vec<String> = conn.lrange(TRANSACTIONS_KEY, 0, -1).await?;
        Self::decode(rows)
    }

    async fn view(&self, offset: usize, limit: usize) -> Result<Vec<DatasetRecord>, DatasetError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (start, stop) = lrange_bounds(offset, limit);
        let rows: Vec<String> = conn.lrange(TRANSACTIONS_KEY, start, stop).await?;
        Self::decode(rows)
    }

    async fn len(&self) -> Result<usize, DatasetError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: usize = conn.llen(TRANSACTIONS_KEY).await?;
        Ok(len)
    }

    async fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), DatasetError> {
        let rows = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatasetError::Row)?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().del(TRANSACTIONS_KEY).ignore();
        for chunk in rows.chunks(LOAD_CHUNK) {
            pipe.rpush(TRANSACTIONS_KEY, chunk).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatasetError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(TRANSACTIONS_KEY).await?;
        Ok(())
    }
}

/// Inclusive `LRANGE` bounds for `limit` rows from `offset`. `-1` means the list end.
fn lrange_bounds(offset: usize, limit: usize) -> (isize, isize) {
    let start = isize::try_from(offset).unwrap_or(isize::MAX);
    let stop = offset
        .checked_add(limit.saturating_sub(1))
        .and_then(|stop| isize::try_from(stop).ok())
        .unwrap_or(-1);
    (start, stop)
}

/// Fetches the dataset CSV, preferring the remote source.
pub struct DatasetLoader {
    http: Client,
    remote_url: Option<String>,
    fallback_path: PathBuf,
}

impl DatasetLoader {
    pub fn new(remote_url: Option<String>, fallback_path: PathBuf) -> Result<Self, DatasetError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(DatasetError::Http)?;
        Ok(Self {
            http,
            remote_url,
            fallback_path,
        })
    }

    /// Read and parse the dataset from the remote URL, or the local file if that fails.
    pub async fn fetch(&self) -> Result<Vec<DatasetRecord>, DatasetError> {
        if let Some(url) = &self.remote_url {
            match self.fetch_remote(url).await {
                Ok(records) => {
                    tracing::info!(url = %url, rows = records.len(), "Loaded dataset from remote source");
                    return Ok(records);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Remote dataset unavailable, using local fallback");
                }
            }
        }

        let text = tokio::fs::read_to_string(&self.fallback_path)
            .await
            .map_err(|e| DatasetError::Io {
                path: self.fallback_path.clone(),
                source: e,
            })?;
        let records = parse_csv(&text)?;
        tracing::info!(
            path = %self.fallback_path.display(),
            rows = records.len(),
            "Loaded dataset from local file"
        );
        Ok(records)
    }

    /// Fetch the dataset and replace the contents of `store` with it.
    pub async fn load_into(&self, store: &dyn TransactionData) -> Result<usize, DatasetError> {
        let records = self.fetch().await?;
        store.replace_all(&records).await?;
        Ok(records.len())
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
        let text = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_csv(&text)
    }
}

/// Parse dataset CSV text. Cells that look numeric become JSON numbers.
pub fn parse_csv(text: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let mut object = Map::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(row.iter()) {
            object.insert(header.to_string(), infer_cell(cell));
        }
        let record = serde_json::from_value(Value::Object(object))
            .map_err(|e| DatasetError::MalformedRow { line: line + 2, source: e })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(records)
}

fn infer_cell(cell: &str) -> Value {
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(cell.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request for dataset failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset row on line {line} is malformed: {source}")]
    MalformedRow {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Stored dataset row is malformed: {0}")]
    Row(serde_json::Error),

    #[error("Dataset contains no rows")]
    Empty,
}
