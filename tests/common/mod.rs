#![allow(dead_code)]

use serde_json::json;
use std::fs;
use std::path::Path;

pub const COLUMNS: [&str; 5] = ["Age", "Region", "Vehicle_Type", "Prior_Claims", "Vehicle_Age"];

/// Writes a complete artifacts directory for a small two-tree forest.
///
/// Tree 0 splits on Age, then Region (left) or Vehicle_Type (right); tree 1 is
/// a stump on Prior_Claims. Predictions are the mean of the two leaves.
pub fn write_artifacts(dir: &Path) {
    let model = json!({
        "n_features": 5,
        "feature_names": COLUMNS,
        "aggregation": "mean",
        "trees": [
            {
                "children_left":  [1, 3, 5, -1, -1, -1, -1],
                "children_right": [2, 4, 6, -1, -1, -1, -1],
                "feature":        [0, 1, 2, -2, -2, -2, -2],
                "threshold":      [40.0, 1.5, 0.5, -2.0, -2.0, -2.0, -2.0],
                "value":          [0.0, 0.0, 0.0, 1000.0, 1800.0, 2200.0, 3000.0],
                "node_sample_weight": [10.0, 6.0, 4.0, 4.0, 2.0, 3.0, 1.0]
            },
            {
                "children_left":  [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature":        [3, -2, -2],
                "threshold":      [1.5, -2.0, -2.0],
                "value":          [0.0, 1200.0, 2600.0],
                "node_sample_weight": [10.0, 7.0, 3.0]
            }
        ]
    });
    fs::write(dir.join("model.json"), model.to_string()).expect("write model");
    fs::write(
        dir.join("binary_encodings.json"),
        json!({"Vehicle_Type": {"SUV": 1, "Sedan": 0}}).to_string(),
    )
    .expect("write binary encodings");
    fs::write(
        dir.join("label_encodings.json"),
        json!({"Region": ["East", "West", "North", "South"]}).to_string(),
    )
    .expect("write label encodings");
    fs::write(dir.join("selected_features.json"), json!(COLUMNS).to_string())
        .expect("write schema");
    fs::write(
        dir.join("metrics.json"),
        json!({"mae": 412.5, "adjusted_r2": 0.87}).to_string(),
    )
    .expect("write metrics");
    fs::write(
        dir.join("actual_vs_predicted.csv"),
        "actual,predicted\n1200.0,1100.0\n800.0,950.0\n2500.5,2300.25\n",
    )
    .expect("write reference curve");
}

/// Prediction for `{"Age": 45, "Region": "North", "Vehicle_Type": "SUV"}`.
pub const SCENARIO_PREDICTION: f64 = 2100.0;

/// Prediction for the empty record: every feature at 0.
pub const EMPTY_PREDICTION: f64 = 1100.0;

/// Cover-weighted baseline: mean of 1720 and 1620.
pub const BASELINE: f64 = 1670.0;
