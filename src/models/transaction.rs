use chrono::NaiveDateTime;
use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Textual format of `trans_date_trans_time`, e.g. "21/06/2020 12:14".
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// A transaction submitted for fraud classification.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    #[garde(custom(valid_timestamp))]
    #[serde(rename = "trans_date_trans_time")]
    pub timestamp: String,

    #[garde(skip)]
    pub merchant: String,

    #[garde(skip)]
    pub category: String,

    #[garde(skip)]
    #[serde(rename = "amt")]
    pub amount: f64,

    #[garde(skip)]
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[garde(skip)]
    #[serde(rename = "long")]
    pub longitude: f64,

    #[garde(skip)]
    #[serde(rename = "job")]
    pub occupation: String,

    #[garde(skip)]
    #[serde(rename = "merch_lat")]
    pub merchant_latitude: f64,

    #[garde(skip)]
    #[serde(rename = "merch_long")]
    pub merchant_longitude: f64,
}

/// A non-empty batch of transactions.
#[derive(Debug, Clone, Validate)]
pub struct TransactionBatch {
    #[garde(length(min = 1), dive)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKind {
    Text,
    Float,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Float => "float",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Float => value.is_f64(),
        }
    }
}

/// Wire fields of a transaction, in their documented order.
const FIELDS: [(&str, FieldKind); 9] = [
    ("trans_date_trans_time", FieldKind::Text),
    ("merchant", FieldKind::Text),
    ("category", FieldKind::Text),
    ("amt", FieldKind::Float),
    ("lat", FieldKind::Float),
    ("long", FieldKind::Float),
    ("job", FieldKind::Text),
    ("merch_lat", FieldKind::Float),
    ("merch_long", FieldKind::Float),
];

impl Transaction {
    /// Build a transaction from one element of a submitted `transactions` list.
    ///
    /// The element must carry exactly the documented fields with the right JSON
    /// types and a timestamp in [`TIMESTAMP_FORMAT`]. Errors name the offending
    /// element index and field.
    pub fn from_json(index: usize, value: &Value) -> Result<Self, String> {
        let object: &Map<String, Value> = value.as_object().ok_or_else(|| {
            format!("JSON param \"transactions\" must be a list of objects (element {index} is not an object).")
        })?;

        for (name, kind) in FIELDS {
            let field = object.get(name).ok_or_else(|| {
                format!("JSON param \"transactions\" has object at index {index} missing key {name}.")
            })?;
            if !kind.accepts(field) {
                return Err(format!(
                    "JSON param \"transactions\" has object at index {index} with key {name} of incorrect type (should be {}).",
                    kind.describe()
                ));
            }
        }

        if let Some(extra) = object.keys().find(|k| !FIELDS.iter().any(|(name, _)| name == k)) {
            return Err(format!(
                "JSON param \"transactions\" has object at index {index} with unexpected key {extra}."
            ));
        }

        let transaction: Transaction = serde_json::from_value(value.clone())
            .map_err(|e| format!("JSON param \"transactions\" has invalid object at index {index}: {e}"))?;

        transaction
            .validate()
            .map_err(|report| format!("JSON param \"transactions\" has invalid object at index {index}: {report}"))?;

        Ok(transaction)
    }

    pub fn parsed_timestamp(&self) -> Result<NaiveDateTime, chrono::ParseError> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

fn valid_timestamp(value: &str, _ctx: &()) -> garde::Result {
    parse_timestamp(value).map(|_| ()).map_err(|_| {
        garde::Error::new(format!(
            "trans_date_trans_time in invalid format (should be {TIMESTAMP_FORMAT})"
        ))
    })
}
