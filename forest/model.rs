use crate::encode::AlignedFeatures;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the exported, human-readable form of a trained tree
// ensemble as written by the training pipeline.

/// How per-tree outputs combine into one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Average of the trees (random forests).
    #[default]
    Mean,
    /// Sum of the trees (boosted ensembles).
    Sum,
}

impl Aggregation {
    /// Weight applied to each tree's output.
    pub fn tree_weight(self, num_trees: usize) -> f64 {
        match self {
            Self::Mean => 1.0 / num_trees as f64,
            Self::Sum => 1.0,
        }
    }
}

/// One tree as parallel per-node arrays, the layout scikit-learn exposes.
///
/// A node is a leaf when its `children_left` entry is negative. Rows go left
/// at a split when `x[feature] <= threshold`. `value` is only read at leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
    /// Training weight reaching each node; used as cover by the explainer.
    pub node_sample_weight: Vec<f64>,
}

/// The model artifact exactly as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleSpec {
    pub n_features: usize,
    /// Column names seen at fit time, when the exporter recorded them.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_offset: f64,
    pub trees: Vec<TreeArrays>,
}

impl EnsembleSpec {
    /// Writes the artifact as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let mut file = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut file, self)?;
        file.flush()?;
        Ok(())
    }
}

/// Custom error type for model loading and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse JSON model file: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("The model contains no trees.")]
    EmptyEnsemble,
    #[error("The model declares zero input features.")]
    NoFeatures,
    #[error("Tree {tree} has no nodes.")]
    EmptyTree { tree: usize },
    #[error("Tree {tree}: array '{field}' has {found} entries but the tree has {expected} nodes.")]
    RaggedTree {
        tree: usize,
        field: &'static str,
        found: usize,
        expected: usize,
    },
    #[error(
        "Tree {tree}, node {node}: child index {child} must point forward to a node below {num_nodes}."
    )]
    InvalidChild {
        tree: usize,
        node: usize,
        child: i64,
        num_nodes: usize,
    },
    #[error("Tree {tree}, node {node}: split feature {feature} is outside 0..{n_features}.")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: i64,
        n_features: usize,
    },
    #[error("Tree {tree}, node {node}: sample weight {weight} must be finite and positive.")]
    InvalidCover { tree: usize, node: usize, weight: f64 },
    #[error("Tree {tree}, node {node}: {field} is not finite.")]
    NonFiniteParameter {
        tree: usize,
        node: usize,
        field: &'static str,
    },
    #[error("The model base offset is not finite.")]
    NonFiniteOffset,
    #[error("The model lists {found} feature names but declares {expected} features.")]
    FeatureNameCount { found: usize, expected: usize },
    #[error("Row has {found} columns, but the model was trained on {expected}.")]
    FeatureMismatch { found: usize, expected: usize },
    #[error(
        "Row column {position} is '{found}', but the model expects '{expected}'. The feature schema is stale relative to the loaded model."
    )]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl Node {
    pub(crate) fn cover(&self) -> f64 {
        match *self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => cover,
        }
    }
}

/// A validated tree. Children always sit at larger indices than their
/// parent, so every walk from the root terminates.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    fn from_arrays(tree: usize, arrays: &TreeArrays, n_features: usize) -> Result<Self, ModelError> {
        let num_nodes = arrays.children_left.len();
        if num_nodes == 0 {
            return Err(ModelError::EmptyTree { tree });
        }
        let lengths = [
            ("children_right", arrays.children_right.len()),
            ("feature", arrays.feature.len()),
            ("threshold", arrays.threshold.len()),
            ("value", arrays.value.len()),
            ("node_sample_weight", arrays.node_sample_weight.len()),
        ];
        for (field, found) in lengths {
            if found != num_nodes {
                return Err(ModelError::RaggedTree {
                    tree,
                    field,
                    found,
                    expected: num_nodes,
                });
            }
        }

        let mut nodes = Vec::with_capacity(num_nodes);
        for node in 0..num_nodes {
            let cover = arrays.node_sample_weight[node];
            if !cover.is_finite() || cover <= 0.0 {
                return Err(ModelError::InvalidCover {
                    tree,
                    node,
                    weight: cover,
                });
            }

            if arrays.children_left[node] < 0 {
                let value = arrays.value[node];
                if !value.is_finite() {
                    return Err(ModelError::NonFiniteParameter {
                        tree,
                        node,
                        field: "leaf value",
                    });
                }
                nodes.push(Node::Leaf { value, cover });
                continue;
            }

            let child = |raw: i64| -> Result<usize, ModelError> {
                if raw <= node as i64 || raw >= num_nodes as i64 {
                    return Err(ModelError::InvalidChild {
                        tree,
                        node,
                        child: raw,
                        num_nodes,
                    });
                }
                Ok(raw as usize)
            };
            let left = child(arrays.children_left[node])?;
            let right = child(arrays.children_right[node])?;

            let feature = arrays.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(ModelError::FeatureOutOfRange {
                    tree,
                    node,
                    feature,
                    n_features,
                });
            }

            let threshold = arrays.threshold[node];
            if !threshold.is_finite() {
                return Err(ModelError::NonFiniteParameter {
                    tree,
                    node,
                    field: "threshold",
                });
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left,
                right,
                cover,
            });
        }

        Ok(Self { nodes })
    }

    /// Value of the leaf `x` falls into.
    pub(crate) fn leaf_value(&self, x: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { value, .. } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => index = if x[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Cover-weighted mean leaf value: the tree's output when no feature is known.
    pub(crate) fn expected_value(&self) -> f64 {
        let mut expectations = vec![0.0; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            expectations[index] = match self.nodes[index] {
                Node::Leaf { value, .. } => value,
                Node::Split {
                    left, right, cover, ..
                } => {
                    let left_share = self.nodes[left].cover() / cover;
                    let right_share = self.nodes[right].cover() / cover;
                    left_share * expectations[left] + right_share * expectations[right]
                }
            };
        }
        expectations[0]
    }
}

/// A trained, validated tree ensemble regressor.
///
/// Immutable after construction; `predict` takes `&self` and may be called
/// from many threads at once.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    n_features: usize,
    feature_names: Option<Vec<String>>,
    aggregation: Aggregation,
    base_offset: f64,
    pub(crate) trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Validates an artifact and compiles it into walkable trees.
    pub fn from_spec(spec: EnsembleSpec) -> Result<Self, ModelError> {
        if spec.n_features == 0 {
            return Err(ModelError::NoFeatures);
        }
        if spec.trees.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        if !spec.base_offset.is_finite() {
            return Err(ModelError::NonFiniteOffset);
        }
        if let Some(names) = &spec.feature_names {
            if names.len() != spec.n_features {
                return Err(ModelError::FeatureNameCount {
                    found: names.len(),
                    expected: spec.n_features,
                });
            }
        }

        let trees = spec
            .trees
            .iter()
            .enumerate()
            .map(|(index, arrays)| Tree::from_arrays(index, arrays, spec.n_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            n_features: spec.n_features,
            feature_names: spec.feature_names,
            aggregation: spec.aggregation,
            base_offset: spec.base_offset,
            trees,
        })
    }

    /// Loads and validates a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path)?;
        let spec: EnsembleSpec = serde_json::from_str(&json)?;
        Self::from_spec(spec)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn base_offset(&self) -> f64 {
        self.base_offset
    }

    /// Weight applied to every tree's contribution.
    pub(crate) fn tree_weight(&self) -> f64 {
        self.aggregation.tree_weight(self.trees.len())
    }

    /// Confirms that `columns` is the layout the model was fitted on.
    pub fn check_columns(&self, columns: &[String]) -> Result<(), ModelError> {
        if columns.len() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                found: columns.len(),
                expected: self.n_features,
            });
        }
        if let Some(names) = &self.feature_names {
            if let Some((position, (expected, found))) = names
                .iter()
                .zip(columns)
                .enumerate()
                .find(|(_, (expected, found))| expected != found)
            {
                return Err(ModelError::ColumnMismatch {
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }

    /// Predicts the target for one aligned row.
    pub fn predict(&self, row: &AlignedFeatures) -> Result<f64, ModelError> {
        self.check_columns(row.columns())?;
        let x = row.values();
        let total: f64 = self.trees.iter().map(|tree| tree.leaf_value(x)).sum();
        let prediction = self.base_offset + self.tree_weight() * total;
        log::debug!("Predicted {prediction:.4} from {} trees", self.trees.len());
        Ok(prediction)
    }

    /// Model output when nothing is known about the row.
    pub fn expected_value(&self) -> f64 {
        let total: f64 = self.trees.iter().map(Tree::expected_value).sum();
        self.base_offset + self.tree_weight() * total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::sync::Arc;

    fn stump(feature: i64, threshold: f64, low: f64, high: f64) -> TreeArrays {
        TreeArrays {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![0.0, low, high],
            node_sample_weight: vec![4.0, 3.0, 1.0],
        }
    }

    fn spec(trees: Vec<TreeArrays>) -> EnsembleSpec {
        EnsembleSpec {
            n_features: 2,
            feature_names: Some(vec!["Age".to_string(), "Region".to_string()]),
            aggregation: Aggregation::Mean,
            base_offset: 0.0,
            trees,
        }
    }

    fn row(values: [f64; 2]) -> AlignedFeatures {
        let columns: Arc<[String]> = vec!["Age".to_string(), "Region".to_string()].into();
        AlignedFeatures::from_parts(columns, array![values[0], values[1]]).unwrap()
    }

    #[test]
    fn mean_aggregation_averages_leaves() {
        let model = TreeEnsemble::from_spec(spec(vec![
            stump(0, 40.0, 1000.0, 3000.0),
            stump(1, 1.5, 500.0, 1500.0),
        ]))
        .unwrap();

        assert_eq!(model.predict(&row([30.0, 2.0])).unwrap(), 1250.0);
        assert_eq!(model.predict(&row([45.0, 0.0])).unwrap(), 1750.0);
        // Threshold is inclusive on the left.
        assert_eq!(model.predict(&row([40.0, 1.5])).unwrap(), 750.0);
    }

    #[test]
    fn sum_aggregation_adds_offset() {
        let mut spec = spec(vec![stump(0, 40.0, -1.0, 1.0), stump(1, 1.5, -2.0, 2.0)]);
        spec.aggregation = Aggregation::Sum;
        spec.base_offset = 10.0;
        let model = TreeEnsemble::from_spec(spec).unwrap();
        assert_eq!(model.predict(&row([50.0, 0.0])).unwrap(), 9.0);
    }

    #[test]
    fn expected_value_weights_leaves_by_cover() {
        let model = TreeEnsemble::from_spec(spec(vec![stump(0, 40.0, 10.0, 20.0)])).unwrap();
        assert_eq!(model.expected_value(), 12.5);
    }

    #[test]
    fn stale_schema_is_reported() {
        let model = TreeEnsemble::from_spec(spec(vec![stump(0, 40.0, 1.0, 2.0)])).unwrap();

        let swapped: Arc<[String]> = vec!["Region".to_string(), "Age".to_string()].into();
        let swapped = AlignedFeatures::from_parts(swapped, array![1.0, 2.0]).unwrap();
        match model.predict(&swapped) {
            Err(ModelError::ColumnMismatch { position, .. }) => assert_eq!(position, 0),
            other => panic!("expected column mismatch, got {other:?}"),
        }

        let narrow: Arc<[String]> = vec!["Age".to_string()].into();
        let narrow = AlignedFeatures::from_parts(narrow, array![1.0]).unwrap();
        assert!(matches!(
            model.predict(&narrow),
            Err(ModelError::FeatureMismatch { found: 1, expected: 2 })
        ));
    }

    #[test]
    fn malformed_trees_are_rejected() {
        let mut backwards = stump(0, 1.0, 1.0, 2.0);
        backwards.children_left[0] = 0;
        assert!(matches!(
            TreeEnsemble::from_spec(spec(vec![backwards])),
            Err(ModelError::InvalidChild { .. })
        ));

        let mut ragged = stump(0, 1.0, 1.0, 2.0);
        ragged.value.pop();
        assert!(matches!(
            TreeEnsemble::from_spec(spec(vec![ragged])),
            Err(ModelError::RaggedTree { field: "value", .. })
        ));

        assert!(matches!(
            TreeEnsemble::from_spec(spec(vec![stump(7, 1.0, 1.0, 2.0)])),
            Err(ModelError::FeatureOutOfRange { feature: 7, .. })
        ));

        let mut weightless = stump(0, 1.0, 1.0, 2.0);
        weightless.node_sample_weight[2] = 0.0;
        assert!(matches!(
            TreeEnsemble::from_spec(spec(vec![weightless])),
            Err(ModelError::InvalidCover { node: 2, .. })
        ));

        assert!(matches!(
            TreeEnsemble::from_spec(spec(vec![])),
            Err(ModelError::EmptyEnsemble)
        ));
    }

    #[test]
    fn save_and_load_preserve_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = spec(vec![stump(0, 40.0, 1000.0, 3000.0)]);
        original.save(&path).unwrap();

        let loaded = TreeEnsemble::load(&path).unwrap();
        assert_eq!(loaded.num_trees(), 1);
        assert_eq!(loaded.predict(&row([41.0, 0.0])).unwrap(), 3000.0);
    }
}
