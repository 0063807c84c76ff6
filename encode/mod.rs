//! # Feature Encoding
//!
//! Everything between a caller's raw record and the numeric row the model
//! consumes: the open record type, the categorical tables produced at training
//! time, the ordered feature schema and the aligner that ties them together.
//!
//! Alignment is lenient by contract. Unknown categories, missing columns and
//! unparseable scalars all degrade to documented defaults; nothing here fails
//! on request data. Errors in this module only arise while *building* tables
//! and schemas from startup artifacts.

pub mod align;
pub mod record;
pub mod schema;
pub mod table;

pub use align::{AlignedFeatures, FeatureAligner, MISSING_FEATURE_VALUE};
pub use record::{RawRecord, RawValue};
pub use schema::FeatureSchema;
pub use table::{CategoryTable, EncodingKind, EncodingStore};

use thiserror::Error;

/// Failures while constructing encoding tables or the feature schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Category '{category}' appears more than once in the encoding table for column '{column}'.")]
    DuplicateCategory { column: String, category: String },
    #[error(
        "Binary encoding for column '{column}' maps category '{category}' to {code}; only 0 and 1 are allowed."
    )]
    InvalidBinaryCode {
        column: String,
        category: String,
        code: f64,
    },
    #[error("The encoding table for column '{column}' contains a null or nested category value.")]
    UnkeyableCategory { column: String },
    #[error("The encoding table for column '{0}' was registered twice.")]
    DuplicateTable(String),
    #[error("Feature '{0}' appears more than once in the feature schema.")]
    DuplicateFeature(String),
    #[error("The feature schema is empty; the model must consume at least one column.")]
    EmptySchema,
    #[error("An aligned row has {found} values but its schema has {expected} columns.")]
    RowWidth { found: usize, expected: usize },
}
