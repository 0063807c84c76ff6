//! # Artifact Configuration
//!
//! A deployment is a directory of artifacts exported by the training pipeline.
//! An optional `claimsev.toml` in that directory renames individual files;
//! without it the default file names are used. Paths in the manifest are
//! resolved relative to the directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the optional manifest inside an artifacts directory.
pub const MANIFEST_FILE: &str = "claimsev.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Artifacts directory '{0}' does not exist or is not a directory.")]
    NotADirectory(PathBuf),
}

/// File names of every startup artifact, relative to the artifacts directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactManifest {
    pub model: PathBuf,
    pub binary_encodings: PathBuf,
    pub label_encodings: PathBuf,
    pub selected_features: PathBuf,
    pub metrics: PathBuf,
    pub actual_vs_predicted: PathBuf,
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self {
            model: PathBuf::from("model.json"),
            binary_encodings: PathBuf::from("binary_encodings.json"),
            label_encodings: PathBuf::from("label_encodings.json"),
            selected_features: PathBuf::from("selected_features.json"),
            metrics: PathBuf::from("metrics.json"),
            actual_vs_predicted: PathBuf::from("actual_vs_predicted.csv"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    artifacts: ArtifactManifest,
}

/// Where the service finds its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub artifact_dir: PathBuf,
    pub manifest: ArtifactManifest,
}

impl ServiceConfig {
    /// Reads `<dir>/claimsev.toml` when present, otherwise uses defaults.
    pub fn load(artifact_dir: &Path) -> Result<Self, ConfigError> {
        if !artifact_dir.is_dir() {
            return Err(ConfigError::NotADirectory(artifact_dir.to_path_buf()));
        }

        let manifest_path = artifact_dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.is_file() {
            let text = fs::read_to_string(&manifest_path).map_err(|source| ConfigError::Read {
                path: manifest_path.clone(),
                source,
            })?;
            let parsed: ManifestFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: manifest_path.clone(),
                source,
            })?;
            log::info!("Using artifact manifest {}", manifest_path.display());
            parsed.artifacts
        } else {
            ArtifactManifest::default()
        };

        Ok(Self {
            artifact_dir: artifact_dir.to_path_buf(),
            manifest,
        })
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.model)
    }

    pub fn binary_encodings_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.binary_encodings)
    }

    pub fn label_encodings_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.label_encodings)
    }

    pub fn selected_features_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.selected_features)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.metrics)
    }

    pub fn actual_vs_predicted_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.manifest.actual_vs_predicted)
    }
}
