use chrono::{Datelike, Timelike};
use std::collections::HashMap;

use crate::models::transaction::Transaction;

/// day, month, year, weekday, hour, minute
pub const CALENDAR_FEATURES: usize = 6;

/// amount, latitude, longitude, merchant latitude, merchant longitude
pub const NUMERIC_FEATURES: usize = 5;

/// Added to every standard deviation before dividing.
const STD_EPSILON: f32 = 1e-8;

/// Ordered labels for one categorical column, with O(1) position lookup.
#[derive(Debug, Clone)]
pub struct OneHot {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl OneHot {
    pub fn new(labels: Vec<String>) -> Self {
        let positions = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self { labels, positions }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Append the one-hot encoding of `value`. Unknown values encode as all zeros.
    fn encode_into(&self, value: &str, row: &mut Vec<f32>) {
        let start = row.len();
        row.resize(start + self.labels.len(), 0.0);
        if let Some(&pos) = self.positions.get(value) {
            row[start + pos] = 1.0;
        }
    }
}

/// Vocabularies computed at training time for the categorical columns.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub merchants: OneHot,
    pub categories: OneHot,
    pub occupations: OneHot,
}

impl Vocabulary {
    /// Width of every flattened feature row.
    pub fn row_width(&self) -> usize {
        CALENDAR_FEATURES
            + NUMERIC_FEATURES
            + self.merchants.len()
            + self.categories.len()
            + self.occupations.len()
    }

    /// Flatten one transaction into a fixed-width numeric row.
    ///
    /// Column order: day, month, year, weekday (Monday = 0), hour, minute,
    /// merchant one-hot, category one-hot, amount, latitude, longitude,
    /// occupation one-hot, merchant latitude, merchant longitude.
    pub fn feature_row(&self, transaction: &Transaction) -> Result<Vec<f32>, VectorizeError> {
        let at = transaction
            .parsed_timestamp()
            .map_err(|_| VectorizeError::Timestamp(transaction.timestamp.clone()))?;

        let mut row = Vec::with_capacity(self.row_width());
        row.extend([
            at.day() as f32,
            at.month() as f32,
            at.year() as f32,
            at.weekday().num_days_from_monday() as f32,
            at.hour() as f32,
            at.minute() as f32,
        ]);
        self.merchants.encode_into(&transaction.merchant, &mut row);
        self.categories.encode_into(&transaction.category, &mut row);
        row.extend([
            transaction.amount as f32,
            transaction.latitude as f32,
            transaction.longitude as f32,
        ]);
        self.occupations.encode_into(&transaction.occupation, &mut row);
        row.extend([
            transaction.merchant_latitude as f32,
            transaction.merchant_longitude as f32,
        ]);
        Ok(row)
    }
}

/// Per-feature mean and standard deviation from the training data.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalizer {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, VectorizeError> {
        if mean.len() != std.len() {
            return Err(VectorizeError::WidthMismatch {
                expected: mean.len(),
                actual: std.len(),
            });
        }
        Ok(Self { mean, std })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Standardize `row` in place: `(x - mean) / (std + 1e-8)`.
    pub fn apply(&self, row: &mut [f32]) -> Result<(), VectorizeError> {
        if row.len() != self.width() {
            return Err(VectorizeError::WidthMismatch {
                expected: self.width(),
                actual: row.len(),
            });
        }
        for ((x, mean), std) in row.iter_mut().zip(&self.mean).zip(&self.std) {
            *x = (*x - mean) / (std + STD_EPSILON);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VectorizeError {
    #[error("Unparseable transaction timestamp: {0}")]
    Timestamp(String),

    #[error("Feature width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}
