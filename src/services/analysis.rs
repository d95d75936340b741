//! Fraud vs legitimate breakdown of the dataset by one categorical feature.

use chrono::{Datelike, NaiveDateTime, Weekday};
use std::collections::{BTreeMap, HashMap};

use crate::models::dataset::DatasetRecord;
use crate::models::job::GraphFeature;
use crate::models::transaction::TIMESTAMP_FORMAT;

/// Dataset exports also appear with ISO timestamps.
const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Transaction count and amount total for one value of the feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
    pub amount: f64,
}

impl Bucket {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            count: 0,
            amount: 0.0,
        }
    }

    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.amount += amount;
    }
}

/// Buckets for the legitimate and fraudulent subsets, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBreakdown {
    pub feature: GraphFeature,
    pub legitimate: Vec<Bucket>,
    pub fraudulent: Vec<Bucket>,
}

/// Partition `records` by `is_fraud` and bucket each subset by `feature`.
///
/// Ordering per feature: months ascending, weekdays Monday to Sunday (zero
/// filled), genders by label, categories in order of first appearance.
pub fn aggregate(
    feature: GraphFeature,
    records: &[DatasetRecord],
) -> Result<FeatureBreakdown, AnalysisError> {
    let (fraudulent, legitimate): (Vec<&DatasetRecord>, Vec<&DatasetRecord>) =
        records.iter().partition(|r| r.is_fraudulent());

    Ok(FeatureBreakdown {
        feature,
        legitimate: bucket(feature, &legitimate)?,
        fraudulent: bucket(feature, &fraudulent)?,
    })
}

fn bucket(feature: GraphFeature, rows: &[&DatasetRecord]) -> Result<Vec<Bucket>, AnalysisError> {
    match feature {
        GraphFeature::Month => {
            let mut months: BTreeMap<String, Bucket> = BTreeMap::new();
            for row in rows {
                let label = row_timestamp(row)?.format("%Y-%m").to_string();
                months
                    .entry(label.clone())
                    .or_insert_with(|| Bucket::empty(label))
                    .add(row.amt);
            }
            Ok(months.into_values().collect())
        }
        GraphFeature::DayOfWeek => {
            let mut days: Vec<Bucket> = WEEKDAYS
                .iter()
                .map(|day| Bucket::empty(day.to_string()))
                .collect();
            for row in rows {
                let day = row_timestamp(row)?.weekday().num_days_from_monday() as usize;
                days[day].add(row.amt);
            }
            Ok(days)
        }
        GraphFeature::Gender => {
            let mut genders: BTreeMap<&str, Bucket> = BTreeMap::new();
            for row in rows {
                genders
                    .entry(row.gender.as_str())
                    .or_insert_with(|| Bucket::empty(row.gender.as_str()))
                    .add(row.amt);
            }
            Ok(genders.into_values().collect())
        }
        GraphFeature::Category => {
            let mut order: HashMap<&str, usize> = HashMap::new();
            let mut categories: Vec<Bucket> = Vec::new();
            for row in rows {
                let slot = *order.entry(row.category.as_str()).or_insert_with(|| {
                    categories.push(Bucket::empty(row.category.as_str()));
                    categories.len() - 1
                });
                categories[slot].add(row.amt);
            }
            Ok(categories)
        }
    }
}

fn row_timestamp(row: &DatasetRecord) -> Result<NaiveDateTime, AnalysisError> {
    let raw = row.trans_date_trans_time.as_str();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, ISO_TIMESTAMP_FORMAT))
        .map_err(|_| AnalysisError::Timestamp(raw.to_string()))
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnalysisError {
    #[error("Dataset row has an unparseable timestamp: {0}")]
    Timestamp(String),
}
