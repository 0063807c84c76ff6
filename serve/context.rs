//! # Serving Context
//!
//! The process-wide state behind every request: encoders, schema, model,
//! explainer, metrics and reference curve. It is built once, explicitly, and
//! handed to whatever serves requests. After construction nothing mutates it,
//! so it is shared by plain reference across worker threads.

use crate::artifacts::{self, ArtifactError};
use crate::config::ServiceConfig;
use crate::encode::{AlignedFeatures, EncodingStore, FeatureAligner, FeatureSchema, RawRecord};
use crate::forest::{ModelError, TreeEnsemble, TreeExplainer};
use crate::response::{HEALTHY, HealthStatus, ModelQuality, PredictionResponse, ReferenceCurve, assemble};
use std::sync::Arc;
use thiserror::Error;

/// A request that could not be answered. The message is returned to the caller.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("The model produced a non-finite prediction ({0}).")]
    NonFinitePrediction(f64),
}

#[derive(Debug)]
pub struct ServingContext {
    aligner: FeatureAligner,
    model: Arc<TreeEnsemble>,
    explainer: TreeExplainer,
    quality: ModelQuality,
    curve: ReferenceCurve,
}

impl ServingContext {
    /// Assembles a context from loaded parts, refusing a schema that does
    /// not match the model.
    pub fn new(
        encodings: EncodingStore,
        schema: FeatureSchema,
        model: TreeEnsemble,
        quality: ModelQuality,
        curve: ReferenceCurve,
    ) -> Result<Self, ArtifactError> {
        model
            .check_columns(schema.columns())
            .map_err(ArtifactError::SchemaMismatch)?;

        let model = Arc::new(model);
        let explainer = TreeExplainer::new(Arc::clone(&model));
        log::info!(
            "Serving context ready: {} features, {} trees, baseline {:.4}",
            schema.len(),
            model.num_trees(),
            explainer.expected_value()
        );

        Ok(Self {
            aligner: FeatureAligner::new(encodings, schema),
            model,
            explainer,
            quality,
            curve,
        })
    }

    /// Loads every artifact named by `config`. Any failure aborts startup.
    pub fn load(config: &ServiceConfig) -> Result<Self, ArtifactError> {
        log::info!("Loading artifacts from {}", config.artifact_dir.display());

        let schema = artifacts::load_schema(&config.selected_features_path())?;
        let mut encodings = EncodingStore::new();
        artifacts::load_binary_encodings(&config.binary_encodings_path(), &mut encodings)?;
        artifacts::load_label_encodings(&config.label_encodings_path(), &mut encodings)?;
        let model = artifacts::load_model(&config.model_path())?;
        let quality = artifacts::load_metrics(&config.metrics_path())?;
        let curve = artifacts::load_reference_curve(&config.actual_vs_predicted_path())?;

        Self::new(encodings, schema, model, quality, curve)
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.aligner.schema()
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn model(&self) -> &TreeEnsemble {
        &self.model
    }

    pub fn explainer(&self) -> &TreeExplainer {
        &self.explainer
    }

    pub fn quality(&self) -> &ModelQuality {
        &self.quality
    }

    pub fn curve(&self) -> &ReferenceCurve {
        &self.curve
    }

    pub fn align(&self, record: &RawRecord) -> AlignedFeatures {
        self.aligner.align(record)
    }

    /// Runs the full request path: align, predict, explain, assemble.
    pub fn predict(&self, record: &RawRecord) -> Result<PredictionResponse<'_>, ServiceError> {
        let row = self.aligner.align(record);
        let prediction = self.model.predict(&row)?;
        if !prediction.is_finite() {
            return Err(ServiceError::NonFinitePrediction(prediction));
        }
        let explanation = self.explainer.explain(&row, record)?;
        Ok(assemble(prediction, explanation, &self.quality, &self.curve))
    }

    pub fn health(&self) -> HealthStatus {
        HEALTHY
    }
}
