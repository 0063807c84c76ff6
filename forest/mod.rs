pub mod explain;
pub mod model;
pub mod shap;

pub use explain::{FeatureAttribution, TOP_ATTRIBUTIONS, TreeExplainer};
pub use model::{Aggregation, EnsembleSpec, ModelError, TreeArrays, TreeEnsemble};
