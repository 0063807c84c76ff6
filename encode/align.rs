use super::EncodingError;
use super::record::RawRecord;
use super::schema::FeatureSchema;
use super::table::EncodingStore;
use ndarray::{Array1, ArrayView1};
use std::sync::Arc;

/// Value for a schema column the record does not supply, or supplies without
/// a usable number.
pub const MISSING_FEATURE_VALUE: f64 = 0.0;

/// One numeric row whose columns are exactly a feature schema, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatures {
    columns: Arc<[String]>,
    values: Array1<f64>,
}

impl AlignedFeatures {
    /// Pairs a column list with its values. Widths must agree.
    pub fn from_parts(columns: Arc<[String]>, values: Array1<f64>) -> Result<Self, EncodingError> {
        if columns.len() != values.len() {
            return Err(EncodingError::RowWidth {
                found: values.len(),
                expected: columns.len(),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| self.values[index])
    }
}

/// Turns raw records into rows the model accepts.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    encodings: EncodingStore,
    schema: FeatureSchema,
}

impl FeatureAligner {
    pub fn new(encodings: EncodingStore, schema: FeatureSchema) -> Self {
        Self { encodings, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encodings(&self) -> &EncodingStore {
        &self.encodings
    }

    /// Produces a row shaped exactly like the schema.
    ///
    /// Categorical columns are recoded through their tables (unknown values
    /// take the table's default). Other columns take their numeric reading.
    /// Absent or unreadable columns are filled with `MISSING_FEATURE_VALUE`;
    /// record keys outside the schema are ignored. Never fails.
    pub fn align(&self, record: &RawRecord) -> AlignedFeatures {
        let values: Array1<f64> = self
            .schema
            .columns()
            .iter()
            .map(|column| match record.get(column) {
                None => MISSING_FEATURE_VALUE,
                Some(raw) => self
                    .encodings
                    .recode(column, raw)
                    .or_else(|| raw.as_number())
                    .unwrap_or(MISSING_FEATURE_VALUE),
            })
            .collect();

        log::debug!(
            "Aligned record with {} supplied fields onto {} schema columns",
            record.len(),
            values.len()
        );

        AlignedFeatures {
            columns: self.schema.shared_columns(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::record::RawValue;

    fn claim_aligner() -> FeatureAligner {
        let mut store = EncodingStore::new();
        store
            .add_binary("Vehicle_Type", [("SUV", 1.0), ("Sedan", 0.0)])
            .unwrap();
        store
            .add_ordinal("Region", ["East", "West", "North", "South"])
            .unwrap();
        let schema = FeatureSchema::new([
            "Age",
            "Region",
            "Vehicle_Type",
            "Prior_Claims",
            "Vehicle_Age",
        ])
        .unwrap();
        FeatureAligner::new(store, schema)
    }

    #[test]
    fn known_categories_land_in_their_columns() {
        let aligner = claim_aligner();
        let record: RawRecord = [
            ("Age", RawValue::from(45)),
            ("Region", RawValue::from("North")),
            ("Vehicle_Type", RawValue::from("SUV")),
        ]
        .into_iter()
        .collect();

        let row = aligner.align(&record);
        assert_eq!(row.columns(), aligner.schema().columns());
        assert_eq!(row.values().to_vec(), vec![45.0, 2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_record_is_all_defaults() {
        let aligner = claim_aligner();
        let row = aligner.align(&RawRecord::new());
        assert_eq!(row.len(), 5);
        assert!(row.values().iter().all(|&v| v == MISSING_FEATURE_VALUE));
    }

    #[test]
    fn unknown_ordinal_category_takes_sentinel() {
        let aligner = claim_aligner();
        let record: RawRecord = [("Region", "Atlantis")].into_iter().collect();
        assert_eq!(aligner.align(&record).get("Region"), Some(-1.0));
    }

    #[test]
    fn unknown_binary_category_takes_zero() {
        let aligner = claim_aligner();
        let record: RawRecord = [("Vehicle_Type", "Hovercraft")].into_iter().collect();
        assert_eq!(aligner.align(&record).get("Vehicle_Type"), Some(0.0));
    }

    #[test]
    fn extra_fields_are_dropped_and_bad_numbers_default() {
        let aligner = claim_aligner();
        let record: RawRecord = [
            ("Age", RawValue::from("forty")),
            ("Prior_Claims", RawValue::from("3")),
            ("Vehicle_Age", RawValue::Null),
            ("Colour", RawValue::from("red")),
        ]
        .into_iter()
        .collect();

        let row = aligner.align(&record);
        assert_eq!(row.len(), 5);
        assert_eq!(row.get("Age"), Some(0.0));
        assert_eq!(row.get("Prior_Claims"), Some(3.0));
        assert_eq!(row.get("Vehicle_Age"), Some(0.0));
        assert_eq!(row.get("Colour"), None);
    }

    #[test]
    fn from_parts_checks_width() {
        let columns: Arc<[String]> = vec!["a".to_string(), "b".to_string()].into();
        let err = AlignedFeatures::from_parts(columns, Array1::zeros(3)).unwrap_err();
        assert_eq!(err, EncodingError::RowWidth { found: 3, expected: 2 });
    }
}
