use super::model::{ModelError, TreeEnsemble};
use super::shap::accumulate_tree_shap;
use crate::encode::{AlignedFeatures, RawRecord, RawValue};
use ndarray::Array1;
use serde::Serialize;
use std::sync::Arc;

/// Number of attributions returned with each prediction.
pub const TOP_ATTRIBUTIONS: usize = 5;

/// `[feature_name, raw_value_or_null, attribution_score]`.
///
/// The raw value is the caller's literal, not the recoded number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAttribution(pub String, pub Option<RawValue>, pub f64);

impl FeatureAttribution {
    pub fn feature(&self) -> &str {
        &self.0
    }

    pub fn raw_value(&self) -> Option<&RawValue> {
        self.1.as_ref()
    }

    pub fn score(&self) -> f64 {
        self.2
    }
}

/// Explains predictions of a shared tree ensemble with TreeSHAP.
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    model: Arc<TreeEnsemble>,
    expected_value: f64,
}

impl TreeExplainer {
    pub fn new(model: Arc<TreeEnsemble>) -> Self {
        let expected_value = model.expected_value();
        Self {
            model,
            expected_value,
        }
    }

    /// Baseline the attributions are measured from.
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    /// One attribution per schema column, in schema order. They sum to the
    /// prediction minus `expected_value`.
    pub fn shap_values(&self, row: &AlignedFeatures) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::from_vec(self.attributions(row)?))
    }

    /// The `TOP_ATTRIBUTIONS` largest attributions by magnitude, each paired
    /// with the value the caller supplied for that feature.
    pub fn explain(
        &self,
        row: &AlignedFeatures,
        record: &RawRecord,
    ) -> Result<Vec<FeatureAttribution>, ModelError> {
        let phi = self.attributions(row)?;
        Ok(rank_attributions(row.columns(), &phi, record, TOP_ATTRIBUTIONS))
    }

    fn attributions(&self, row: &AlignedFeatures) -> Result<Vec<f64>, ModelError> {
        self.model.check_columns(row.columns())?;
        let x = row.values();
        let scale = self.model.tree_weight();
        let mut phi = vec![0.0; row.len()];
        for tree in &self.model.trees {
            accumulate_tree_shap(tree, x, scale, &mut phi);
        }
        Ok(phi)
    }
}

/// Orders attributions by descending magnitude and keeps the first `limit`.
///
/// The sort is stable, so equal magnitudes keep schema order.
pub fn rank_attributions(
    columns: &[String],
    scores: &[f64],
    record: &RawRecord,
    limit: usize,
) -> Vec<FeatureAttribution> {
    let mut ranked: Vec<FeatureAttribution> = columns
        .iter()
        .zip(scores)
        .map(|(column, &score)| FeatureAttribution(column.clone(), record.get(column).cloned(), score))
        .collect();
    ranked.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
    ranked.truncate(limit);
    ranked
}
