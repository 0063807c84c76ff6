use super::EncodingError;
use super::record::RawValue;
use ahash::AHashMap;

/// The two categorical encodings produced at training time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    /// Two-level feature mapped onto {0, 1}.
    Binary,
    /// Feature mapped onto codes 0..n by a fixed category ordering.
    Ordinal,
}

impl EncodingKind {
    /// Code substituted for a value the table does not know.
    pub const fn unknown_code(self) -> f64 {
        match self {
            Self::Binary => 0.0,
            Self::Ordinal => -1.0,
        }
    }

    /// Lower-case name used in summaries.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Ordinal => "ordinal",
        }
    }
}

/// A category-to-code table with a lookup that never fails.
///
/// Binary and ordinal encodings differ only in how the table is built and in
/// the code returned for an unknown value; `encode` is shared.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    kind: EncodingKind,
    codes: AHashMap<String, f64>,
}

impl CategoryTable {
    /// Builds a binary table from `(category, code)` pairs. Codes must be 0 or 1.
    pub fn binary<I, K>(column: &str, levels: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut codes = AHashMap::new();
        for (category, code) in levels {
            let category = category.into();
            if code != 0.0 && code != 1.0 {
                return Err(EncodingError::InvalidBinaryCode {
                    column: column.to_string(),
                    category,
                    code,
                });
            }
            if codes.insert(category.clone(), code).is_some() {
                return Err(EncodingError::DuplicateCategory {
                    column: column.to_string(),
                    category,
                });
            }
        }
        Ok(Self {
            kind: EncodingKind::Binary,
            codes,
        })
    }

    /// Builds an ordinal table; the n-th category receives code n.
    pub fn ordinal<I, V>(column: &str, categories: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        let mut codes = AHashMap::new();
        for (position, category) in categories.into_iter().enumerate() {
            let category = category.into();
            let key = category
                .category_key()
                .ok_or_else(|| EncodingError::UnkeyableCategory {
                    column: column.to_string(),
                })?
                .into_owned();
            if codes.insert(key.clone(), position as f64).is_some() {
                return Err(EncodingError::DuplicateCategory {
                    column: column.to_string(),
                    category: key,
                });
            }
        }
        Ok(Self {
            kind: EncodingKind::Ordinal,
            codes,
        })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code for `value`, or the kind's unknown code when the value has no
    /// entry (including null and nested values).
    pub fn encode(&self, value: &RawValue) -> f64 {
        value
            .category_key()
            .and_then(|key| self.codes.get(key.as_ref()).copied())
            .unwrap_or(self.kind.unknown_code())
    }
}

/// All categorical tables, keyed by the column they recode.
#[derive(Debug, Clone, Default)]
pub struct EncodingStore {
    binary: AHashMap<String, CategoryTable>,
    ordinal: AHashMap<String, CategoryTable>,
}

impl EncodingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary<I, K>(&mut self, column: &str, levels: I) -> Result<(), EncodingError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let table = CategoryTable::binary(column, levels)?;
        Self::register(&mut self.binary, column, table)
    }

    pub fn add_ordinal<I, V>(&mut self, column: &str, categories: I) -> Result<(), EncodingError>
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        let table = CategoryTable::ordinal(column, categories)?;
        Self::register(&mut self.ordinal, column, table)
    }

    fn register(
        tables: &mut AHashMap<String, CategoryTable>,
        column: &str,
        table: CategoryTable,
    ) -> Result<(), EncodingError> {
        if tables.contains_key(column) {
            return Err(EncodingError::DuplicateTable(column.to_string()));
        }
        tables.insert(column.to_string(), table);
        Ok(())
    }

    pub fn table(&self, kind: EncodingKind, column: &str) -> Option<&CategoryTable> {
        match kind {
            EncodingKind::Binary => self.binary.get(column),
            EncodingKind::Ordinal => self.ordinal.get(column),
        }
    }

    pub fn table_count(&self, kind: EncodingKind) -> usize {
        match kind {
            EncodingKind::Binary => self.binary.len(),
            EncodingKind::Ordinal => self.ordinal.len(),
        }
    }

    /// Recodes `value` for `column`, or `None` when the column is not
    /// categorical. Binary recoding runs first; a column present in both
    /// tables is ordinal-encoded from its binary code.
    pub fn recode(&self, column: &str, value: &RawValue) -> Option<f64> {
        match (self.binary.get(column), self.ordinal.get(column)) {
            (None, None) => None,
            (Some(binary), None) => Some(binary.encode(value)),
            (None, Some(ordinal)) => Some(ordinal.encode(value)),
            (Some(binary), Some(ordinal)) => {
                let code = RawValue::Int(binary.encode(value) as i64);
                Some(ordinal.encode(&code))
            }
        }
    }
}
