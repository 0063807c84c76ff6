//! In-memory serving state shared by the unit tests of the serving layer.

use crate::context::ServingContext;
use crate::encode::{EncodingStore, FeatureSchema};
use crate::forest::{Aggregation, EnsembleSpec, TreeArrays, TreeEnsemble};
use crate::response::{ModelQuality, ReferenceCurve};

pub(crate) const COLUMNS: [&str; 5] = ["Age", "Region", "Vehicle_Type", "Prior_Claims", "Vehicle_Age"];

/// Two-tree forest: an age/region/vehicle tree and a prior-claims stump.
pub(crate) fn ensemble_spec() -> EnsembleSpec {
    EnsembleSpec {
        n_features: COLUMNS.len(),
        feature_names: Some(COLUMNS.iter().map(|c| c.to_string()).collect()),
        aggregation: Aggregation::Mean,
        base_offset: 0.0,
        trees: vec![
            TreeArrays {
                children_left: vec![1, 3, 5, -1, -1, -1, -1],
                children_right: vec![2, 4, 6, -1, -1, -1, -1],
                feature: vec![0, 1, 2, -2, -2, -2, -2],
                threshold: vec![40.0, 1.5, 0.5, -2.0, -2.0, -2.0, -2.0],
                value: vec![0.0, 0.0, 0.0, 1000.0, 1800.0, 2200.0, 3000.0],
                node_sample_weight: vec![10.0, 6.0, 4.0, 4.0, 2.0, 3.0, 1.0],
            },
            TreeArrays {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![3, -2, -2],
                threshold: vec![1.5, -2.0, -2.0],
                value: vec![0.0, 1200.0, 2600.0],
                node_sample_weight: vec![10.0, 7.0, 3.0],
            },
        ],
    }
}

pub(crate) fn context() -> ServingContext {
    let mut encodings = EncodingStore::new();
    encodings
        .add_binary("Vehicle_Type", [("SUV", 1.0), ("Sedan", 0.0)])
        .unwrap();
    encodings
        .add_ordinal("Region", ["East", "West", "North", "South"])
        .unwrap();

    ServingContext::new(
        encodings,
        FeatureSchema::new(COLUMNS).unwrap(),
        TreeEnsemble::from_spec(ensemble_spec()).unwrap(),
        ModelQuality {
            mae: 412.5,
            adjusted_r2: 0.87,
        },
        ReferenceCurve::from_points([(1200.0, 1100.0), (800.0, 950.0)]),
    )
    .unwrap()
}
