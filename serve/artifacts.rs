//! # Startup Artifact Loading
//!
//! Reads the files exported by the training pipeline into their validated
//! in-memory forms. Every loader attaches the offending path to its error;
//! any failure here is fatal to process start.

use crate::config::ConfigError;
use crate::encode::{EncodingError, EncodingStore, FeatureSchema, RawValue};
use crate::forest::{ModelError, TreeEnsemble};
use crate::response::{ModelQuality, ReferenceCurve};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Required artifact '{name}' was not found at '{path}'.")]
    Missing { name: &'static str, path: PathBuf },
    #[error("Failed to read artifact '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Artifact '{path}' is not valid JSON of the expected shape: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Artifact '{path}' is not a valid actual,predicted CSV: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Artifact '{path}' row {row} holds a non-finite value.")]
    NonFiniteCurvePoint { path: PathBuf, row: usize },
    #[error("Invalid encoding table in '{path}': {source}")]
    Encoding {
        path: PathBuf,
        source: EncodingError,
    },
    #[error(
        "Label encoding for column '{column}' in '{path}' must be keyed by codes 0..n, found key '{key}'."
    )]
    LabelCodes {
        path: PathBuf,
        column: String,
        key: String,
    },
    #[error("Invalid model artifact '{path}': {source}")]
    Model { path: PathBuf, source: ModelError },
    #[error("Metric '{name}' in '{path}' is not finite.")]
    NonFiniteMetric { path: PathBuf, name: &'static str },
    #[error("The feature schema does not match the loaded model: {0}")]
    SchemaMismatch(#[source] ModelError),
}

/// Label-encoding categories in either of the two exported shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdinalCategories {
    /// `["East", "West", ...]`, position is the code.
    Sequence(Vec<RawValue>),
    /// `{"0": "East", "1": "West", ...}`, keyed by code.
    ByCode(BTreeMap<String, RawValue>),
}

impl OrdinalCategories {
    fn into_ordered(self, path: &Path, column: &str) -> Result<Vec<RawValue>, ArtifactError> {
        match self {
            OrdinalCategories::Sequence(categories) => Ok(categories),
            OrdinalCategories::ByCode(by_code) => {
                let mut coded = Vec::with_capacity(by_code.len());
                for (key, category) in by_code {
                    let code = key.trim().parse::<usize>().map_err(|_| ArtifactError::LabelCodes {
                        path: path.to_path_buf(),
                        column: column.to_string(),
                        key: key.clone(),
                    })?;
                    coded.push((code, key, category));
                }
                coded.sort_by_key(|(code, _, _)| *code);

                let mut ordered = Vec::with_capacity(coded.len());
                for (expected, (code, key, category)) in coded.into_iter().enumerate() {
                    if code != expected {
                        return Err(ArtifactError::LabelCodes {
                            path: path.to_path_buf(),
                            column: column.to_string(),
                            key,
                        });
                    }
                    ordered.push(category);
                }
                Ok(ordered)
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(name: &'static str, path: &Path) -> Result<T, ArtifactError> {
    if !path.is_file() {
        return Err(ArtifactError::Missing {
            name,
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and validates the tree ensemble.
pub fn load_model(path: &Path) -> Result<TreeEnsemble, ArtifactError> {
    if !path.is_file() {
        return Err(ArtifactError::Missing {
            name: "model",
            path: path.to_path_buf(),
        });
    }
    let model = TreeEnsemble::load(path).map_err(|source| ArtifactError::Model {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded model from {}: {} trees over {} features ({:?} aggregation)",
        path.display(),
        model.num_trees(),
        model.n_features(),
        model.aggregation()
    );
    Ok(model)
}

/// Adds every binary table in `path` to `store`.
pub fn load_binary_encodings(path: &Path, store: &mut EncodingStore) -> Result<(), ArtifactError> {
    let tables: HashMap<String, HashMap<String, f64>> = read_json("binary_encodings", path)?;
    let count = tables.len();
    for (column, levels) in tables {
        store
            .add_binary(&column, levels)
            .map_err(|source| ArtifactError::Encoding {
                path: path.to_path_buf(),
                source,
            })?;
    }
    log::info!("Loaded {count} binary encodings from {}", path.display());
    Ok(())
}

/// Adds every ordinal (label) table in `path` to `store`.
pub fn load_label_encodings(path: &Path, store: &mut EncodingStore) -> Result<(), ArtifactError> {
    let tables: HashMap<String, OrdinalCategories> = read_json("label_encodings", path)?;
    let count = tables.len();
    for (column, categories) in tables {
        let ordered = categories.into_ordered(path, &column)?;
        store
            .add_ordinal(&column, ordered)
            .map_err(|source| ArtifactError::Encoding {
                path: path.to_path_buf(),
                source,
            })?;
    }
    log::info!("Loaded {count} label encodings from {}", path.display());
    Ok(())
}

/// Loads the ordered list of model input columns.
pub fn load_schema(path: &Path) -> Result<FeatureSchema, ArtifactError> {
    let names: Vec<String> = read_json("selected_features", path)?;
    let schema = FeatureSchema::new(names).map_err(|source| ArtifactError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loaded feature schema with {} columns from {}", schema.len(), path.display());
    Ok(schema)
}

/// Loads the offline evaluation metrics.
pub fn load_metrics(path: &Path) -> Result<ModelQuality, ArtifactError> {
    let quality: ModelQuality = read_json("metrics", path)?;
    for (name, value) in [("mae", quality.mae), ("adjusted_r2", quality.adjusted_r2)] {
        if !value.is_finite() {
            return Err(ArtifactError::NonFiniteMetric {
                path: path.to_path_buf(),
                name,
            });
        }
    }
    log::info!(
        "Loaded metrics from {}: MAE {:.4}, adjusted R^2 {:.4}",
        path.display(),
        quality.mae,
        quality.adjusted_r2
    );
    Ok(quality)
}

#[derive(Debug, Deserialize)]
struct CurveRow {
    actual: f64,
    predicted: f64,
}

/// Loads the actual-vs-predicted reference table.
pub fn load_reference_curve(path: &Path) -> Result<ReferenceCurve, ArtifactError> {
    if !path.is_file() {
        return Err(ArtifactError::Missing {
            name: "actual_vs_predicted",
            path: path.to_path_buf(),
        });
    }
    let csv_error = |source| ArtifactError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let mut points = Vec::new();
    for (index, row) in reader.deserialize::<CurveRow>().enumerate() {
        let row = row.map_err(csv_error)?;
        if !row.actual.is_finite() || !row.predicted.is_finite() {
            return Err(ArtifactError::NonFiniteCurvePoint {
                path: path.to_path_buf(),
                row: index + 1,
            });
        }
        points.push((row.actual, row.predicted));
    }

    let curve = ReferenceCurve::from_points(points);
    log::info!("Loaded {} reference points from {}", curve.len(), path.display());
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EncodingKind;
    use tempfile::tempdir;

    #[test]
    fn label_encodings_accept_both_shapes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("label_encodings.json");
        fs::write(
            &path,
            r#"{"Region": {"1": "West", "0": "East", "2": "North"}, "Doors": [2, 4, 5]}"#,
        )
        .unwrap();

        let mut store = EncodingStore::new();
        load_label_encodings(&path, &mut store).unwrap();
        let region = store.table(EncodingKind::Ordinal, "Region").unwrap();
        assert_eq!(region.encode(&RawValue::from("North")), 2.0);
        assert_eq!(region.encode(&RawValue::from("East")), 0.0);
        let doors = store.table(EncodingKind::Ordinal, "Doors").unwrap();
        assert_eq!(doors.encode(&RawValue::from(5)), 2.0);
    }

    #[test]
    fn label_codes_must_be_contiguous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("label_encodings.json");
        fs::write(&path, r#"{"Region": {"0": "East", "2": "North"}}"#).unwrap();

        let mut store = EncodingStore::new();
        let err = load_label_encodings(&path, &mut store).unwrap_err();
        assert!(matches!(err, ArtifactError::LabelCodes { ref key, .. } if key == "2"));
    }

    #[test]
    fn binary_codes_are_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binary_encodings.json");
        fs::write(&path, r#"{"Vehicle_Type": {"SUV": 1, "Sedan": 3}}"#).unwrap();

        let mut store = EncodingStore::new();
        let err = load_binary_encodings(&path, &mut store).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Encoding {
                source: EncodingError::InvalidBinaryCode { .. },
                ..
            }
        ));
    }

    #[test]
    fn reference_curve_reads_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actual_vs_predicted.csv");
        fs::write(&path, "actual,predicted\n1200.0, 1100.5\n800,900\n").unwrap();

        let curve = load_reference_curve(&path).unwrap();
        assert_eq!(curve.points(), &[(1200.0, 1100.5), (800.0, 900.0)]);
    }

    #[test]
    fn missing_artifacts_name_the_file() {
        let dir = tempdir().unwrap();
        let err = load_schema(&dir.path().join("selected_features.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { name: "selected_features", .. }));
        assert!(err.to_string().contains("selected_features.json"));
    }

    #[test]
    fn metrics_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, r#"{"mae": 412.5, "adjusted_r2": 0.87}"#).unwrap();
        let quality = load_metrics(&path).unwrap();
        assert_eq!(quality.mae, 412.5);
        assert_eq!(quality.adjusted_r2, 0.87);
    }
}
