//! Sample transactions, dataset rows and model artifacts shared by the test suites

#![allow(dead_code)]

use fraud_jobs::models::dataset::DatasetRecord;
use fraud_jobs::services::artifacts::{
    ModelBundle, CATEGORIES_FILE, MEAN_STD_FILE, MERCHANTS_FILE, MODEL_FILE, OCCUPATIONS_FILE,
};
use fraud_jobs::services::classifier::{BinaryClassifier, Layer};
use fraud_jobs::services::dataset::parse_csv;
use fraud_jobs::services::vectorize::{Normalizer, OneHot, Vocabulary};
use serde_json::{json, Value};
use std::path::Path;

pub const MERCHANTS: [&str; 2] = ["fraud_Kirlin and Sons", "fraud_Sporer-Keebler"];
pub const CATEGORIES: [&str; 2] = ["personal_care", "shopping_pos"];
pub const OCCUPATIONS: [&str; 2] = ["Mechanical engineer", "Sales professional, IT"];

/// Feature row width for the fixture vocabularies.
pub const ROW_WIDTH: usize = 11 + 2 + 2 + 2;

/// Position of `amt` in a feature row: six calendar columns, two merchants, two categories.
const AMOUNT_COLUMN: usize = 10;

/// Amounts strictly above this are classified as fraud by the fixture model.
pub const FRAUD_THRESHOLD: f32 = 100.0;

/// A well-formed transaction with the given amount.
pub fn transaction(amt: f64) -> Value {
    json!({
        "trans_date_trans_time": "21/06/2020 12:14",
        "merchant": MERCHANTS[0],
        "category": CATEGORIES[0],
        "amt": amt,
        "lat": 33.9659,
        "long": -80.9355,
        "job": OCCUPATIONS[0],
        "merch_lat": 33.986391,
        "merch_long": -81.200714
    })
}

/// Eight dataset rows: six legitimate, two fraudulent, spread over two months.
pub const DATASET_CSV: &str = "\
,trans_date_trans_time,cc_num,merchant,category,amt,gender,city,state,zip,is_fraud
0,21/06/2020 12:14,2291163933867244,fraud_Kirlin and Sons,personal_care,2.86,M,Columbia,SC,29209,0
1,21/06/2020 12:14,3573030041201292,fraud_Sporer-Keebler,personal_care,29.84,F,Altonah,UT,84002,0
2,22/06/2020 12:15,3598215285024754,fraud_Swaniawski and Sons,health_fitness,41.28,F,Bellmore,NY,11710,0
3,23/06/2020 12:15,3591919803438423,fraud_Haley Group,misc_pos,60.05,M,Titusville,FL,32780,0
4,01/07/2020 12:16,3526826139003047,fraud_Johnston-Casper,travel,3.19,M,Falmouth,MI,49632,0
5,02/07/2020 12:16,30407675418785,fraud_Daugherty LLC,kids_pets,19.55,F,Breesport,NY,14816,0
6,21/06/2020 22:06,3560725013359375,fraud_Kozey-Boehm,shopping_net,1077.69,F,San Antonio,TX,78208,1
7,03/07/2020 01:17,4306630000000000,fraud_Heller-Langosh,shopping_pos,842.65,M,Oakland,CA,94612,1
";

pub fn dataset() -> Vec<DatasetRecord> {
    parse_csv(DATASET_CSV).expect("fixture dataset parses")
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Identity normalization and a single linear unit on the amount column.
pub fn model_bundle() -> ModelBundle {
    let vocabulary = Vocabulary {
        merchants: OneHot::new(labels(&MERCHANTS)),
        categories: OneHot::new(labels(&CATEGORIES)),
        occupations: OneHot::new(labels(&OCCUPATIONS)),
    };
    let normalizer = Normalizer::new(vec![0.0; ROW_WIDTH], vec![1.0; ROW_WIDTH]).unwrap();
    let mut weight = vec![0.0; ROW_WIDTH];
    weight[AMOUNT_COLUMN] = 1.0;
    let classifier = BinaryClassifier::new(vec![
        Layer::Linear {
            weight: vec![weight],
            bias: vec![-FRAUD_THRESHOLD],
        },
        Layer::Sigmoid,
    ])
    .unwrap();
    ModelBundle::new(vocabulary, normalizer, classifier).unwrap()
}

/// Write the same model as artifact files into `dir`.
pub fn write_artifacts(dir: &Path) {
    std::fs::write(dir.join(MERCHANTS_FILE), MERCHANTS.join("\n")).unwrap();
    std::fs::write(dir.join(CATEGORIES_FILE), CATEGORIES.join("\n")).unwrap();
    std::fs::write(dir.join(OCCUPATIONS_FILE), OCCUPATIONS.join("\n")).unwrap();

    let zeros = vec!["0.0"; ROW_WIDTH].join(", ");
    let ones = vec!["1.0"; ROW_WIDTH].join(", ");
    std::fs::write(dir.join(MEAN_STD_FILE), format!("{zeros}\n{ones}\n")).unwrap();

    let mut weight = vec![0.0_f32; ROW_WIDTH];
    weight[AMOUNT_COLUMN] = 1.0;
    let model = json!({
        "layers": [
            {"type": "linear", "weight": [weight], "bias": [-FRAUD_THRESHOLD]},
            {"type": "sigmoid"}
        ]
    });
    std::fs::write(dir.join(MODEL_FILE), model.to_string()).unwrap();
}
