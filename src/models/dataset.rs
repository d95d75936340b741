use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the shared transaction dataset.
///
/// Only the columns used by graph-feature analysis are typed; every other
/// column is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRecord {
    pub trans_date_trans_time: String,
    pub amt: f64,
    pub gender: String,
    pub category: String,
    pub is_fraud: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetRecord {
    pub fn is_fraudulent(&self) -> bool {
        self.is_fraud == 1
    }
}
