//! Kind-specific work performed for a claimed job.

use garde::Validate;
use std::sync::Arc;

use crate::models::job::{GraphFeature, JobPayload};
use crate::models::transaction::{Transaction, TransactionBatch};
use crate::services::analysis::{self, AnalysisError};
use crate::services::artifacts::{ArtifactError, ArtifactProvider, ModelBundle};
use crate::services::classifier::ModelError;
use crate::services::dataset::{DatasetError, TransactionData};
use crate::services::plot::{self, RenderError};
use crate::services::vectorize::VectorizeError;

/// Breaks the shared dataset down by one feature and renders the comparison chart.
pub struct GraphFeatureAnalysis {
    data: Arc<dyn TransactionData>,
}

impl GraphFeatureAnalysis {
    pub fn new(data: Arc<dyn TransactionData>) -> Self {
        Self { data }
    }

    /// Returns PNG bytes.
    pub async fn run(&self, feature: GraphFeature) -> Result<Vec<u8>, ExecutionError> {
        let records = self.data.get_all().await?;
        if records.is_empty() {
            return Err(ExecutionError::EmptyDataset);
        }
        tracing::debug!(feature = %feature, rows = records.len(), "Aggregating dataset");

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ExecutionError> {
            let breakdown = analysis::aggregate(feature, &records)?;
            Ok(plot::render(&breakdown)?)
        })
        .await?
    }
}

/// Scores submitted transactions with the trained classifier.
pub struct TransactionClassification {
    artifacts: Arc<dyn ArtifactProvider>,
}

impl TransactionClassification {
    pub fn new(artifacts: Arc<dyn ArtifactProvider>) -> Self {
        Self { artifacts }
    }

    /// Returns a JSON array of 0/1 predictions in input order.
    pub async fn run(&self, transactions: &[Transaction]) -> Result<Vec<u8>, ExecutionError> {
        // Payloads are replayed from storage, so they are checked again here.
        let batch = TransactionBatch {
            transactions: transactions.to_vec(),
        };
        batch
            .validate()
            .map_err(|e| ExecutionError::InvalidBatch(e.to_string()))?;

        let bundle = self.artifacts.load().await?;
        let predictions =
            tokio::task::spawn_blocking(move || classify(&bundle, &batch.transactions)).await??;
        Ok(serde_json::to_vec(&predictions)?)
    }
}

/// Vectorize, normalize and score each transaction.
pub fn classify(
    bundle: &ModelBundle,
    transactions: &[Transaction],
) -> Result<Vec<u8>, ExecutionError> {
    transactions
        .iter()
        .map(|transaction| -> Result<u8, ExecutionError> {
            let mut row = bundle.vocabulary.feature_row(transaction)?;
            bundle.normalizer.apply(&mut row)?;
            Ok(bundle.classifier.predict(&row)?)
        })
        .collect()
}

/// Routes a payload to the strategy for its kind.
pub struct JobExecutor {
    graph: GraphFeatureAnalysis,
    classification: TransactionClassification,
}

impl JobExecutor {
    pub fn new(data: Arc<dyn TransactionData>, artifacts: Arc<dyn ArtifactProvider>) -> Self {
        Self {
            graph: GraphFeatureAnalysis::new(data),
            classification: TransactionClassification::new(artifacts),
        }
    }

    /// Produce the result blob for `payload`.
    pub async fn execute(&self, payload: &JobPayload) -> Result<Vec<u8>, ExecutionError> {
        match payload {
            JobPayload::GraphFeature { feature } => self.graph.run(*feature).await,
            JobPayload::TransactionBatch { transactions } => {
                self.classification.run(transactions).await
            }
        }
    }
}

/// Failure inside a strategy. Recorded as a failed job, never returned to a client.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Transaction data unavailable: {0}")]
    Data(#[from] DatasetError),

    #[error("Transaction dataset is empty")]
    EmptyDataset,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Stored transaction batch is invalid: {0}")]
    InvalidBatch(String),

    #[error("Model artifacts unavailable: {0}")]
    Artifacts(#[from] ArtifactError),

    #[error(transparent)]
    Vectorize(#[from] VectorizeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to serialize predictions: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Execution task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),
}
