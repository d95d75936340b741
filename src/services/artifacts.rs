use async_trait::async_trait;
use std::path::PathBuf;

use crate::services::classifier::{BinaryClassifier, ModelError};
use crate::services::vectorize::{Normalizer, OneHot, VectorizeError, Vocabulary};

pub const MERCHANTS_FILE: &str = "merchants.txt";
pub const CATEGORIES_FILE: &str = "categories.txt";
pub const OCCUPATIONS_FILE: &str = "jobs.txt";
pub const MEAN_STD_FILE: &str = "meanandstd.txt";
pub const MODEL_FILE: &str = "binary_classifier.json";

/// Everything the classification strategy needs, checked for width agreement.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub vocabulary: Vocabulary,
    pub normalizer: Normalizer,
    pub classifier: BinaryClassifier,
}

impl ModelBundle {
    pub fn new(
        vocabulary: Vocabulary,
        normalizer: Normalizer,
        classifier: BinaryClassifier,
    ) -> Result<Self, ArtifactError> {
        let width = vocabulary.row_width();
        if normalizer.width() != width {
            return Err(ArtifactError::Inconsistent(format!(
                "{MEAN_STD_FILE} has {} columns, vocabularies give {width}",
                normalizer.width()
            )));
        }
        if classifier.input_width() != width {
            return Err(ArtifactError::Inconsistent(format!(
                "{MODEL_FILE} expects {} inputs, vocabularies give {width}",
                classifier.input_width()
            )));
        }
        Ok(Self {
            vocabulary,
            normalizer,
            classifier,
        })
    }
}

/// Source of the trained classifier and its encoding artifacts.
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    async fn load(&self) -> Result<ModelBundle, ArtifactError>;
}

/// Reads artifacts from a directory on every `load`, so a retrained model
/// is picked up by the next job without a restart.
pub struct FsArtifacts {
    dir: PathBuf,
}

impl FsArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, name: &str) -> Result<String, ArtifactError> {
        let path = self.dir.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ArtifactError::Io { path, source })
    }
}

#[async_trait]
impl ArtifactProvider for FsArtifacts {
    async fn load(&self) -> Result<ModelBundle, ArtifactError> {
        let vocabulary = Vocabulary {
            merchants: OneHot::new(parse_labels(&self.read(MERCHANTS_FILE).await?)),
            categories: OneHot::new(parse_labels(&self.read(CATEGORIES_FILE).await?)),
            occupations: OneHot::new(parse_labels(&self.read(OCCUPATIONS_FILE).await?)),
        };
        let normalizer = parse_mean_std(&self.read(MEAN_STD_FILE).await?)?;
        let classifier = BinaryClassifier::from_json(self.read(MODEL_FILE).await?.as_bytes())?;

        tracing::debug!(
            dir = %self.dir.display(),
            width = vocabulary.row_width(),
            "Loaded model artifacts"
        );
        ModelBundle::new(vocabulary, normalizer, classifier)
    }
}

/// One label per line; blank lines are ignored.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Two comma-separated lines: means, then standard deviations.
pub fn parse_mean_std(text: &str) -> Result<Normalizer, ArtifactError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let (Some(mean), Some(std)) = (lines.next(), lines.next()) else {
        return Err(ArtifactError::Malformed {
            file: MEAN_STD_FILE,
            reason: "expected a mean line and a standard deviation line".to_string(),
        });
    };
    Ok(Normalizer::new(parse_floats(mean)?, parse_floats(std)?)?)
}

fn parse_floats(line: &str) -> Result<Vec<f32>, ArtifactError> {
    line.split(',')
        .map(str::trim)
        .map(|cell| {
            cell.parse::<f32>().map_err(|_| ArtifactError::Malformed {
                file: MEAN_STD_FILE,
                reason: format!("'{cell}' is not a number"),
            })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed {file}: {reason}")]
    Malformed { file: &'static str, reason: String },

    #[error("Artifacts disagree: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Width(#[from] VectorizeError),
}
