use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000"). Unused by worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string. The logical database index is chosen per store.
    pub redis_url: String,

    /// Number of independent worker loops started by the worker binary.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Seconds a worker blocks on the queue before re-checking for shutdown.
    #[serde(default = "default_queue_poll_secs")]
    pub queue_poll_secs: u64,

    /// Directory holding the classifier, vocabulary and normalization files.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Remote CSV location for the transaction dataset.
    pub dataset_url: Option<String>,

    /// Local CSV used when the remote dataset cannot be fetched.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Prometheus listener for the worker process (e.g., "0.0.0.0:9100").
    pub worker_metrics_addr: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_worker_count() -> usize {
    1
}

fn default_queue_poll_secs() -> u64 {
    1
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("./data/fraud_test.csv")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Build a configuration from explicit key/value pairs instead of the process environment.
    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
