use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Largest magnitude at which every integral `f64` is exactly representable.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// One scalar from a caller-supplied record.
///
/// Deserialisation is untagged, so the variant is chosen by the JSON shape and
/// serialising a value reproduces the literal the caller sent. Arrays and
/// objects are carried as `Composite` rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Composite(Value),
}

impl RawValue {
    /// The string under which this value is looked up in a category table.
    ///
    /// Integral floats share the key of the equal integer so `2` and `2.0`
    /// select the same category. Null and composite values have no key.
    pub fn category_key(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Text(text) => Some(Cow::Borrowed(text.as_str())),
            RawValue::Int(value) => Some(Cow::Owned(value.to_string())),
            RawValue::Float(value) => float_key(*value).map(Cow::Owned),
            RawValue::Bool(true) => Some(Cow::Borrowed("true")),
            RawValue::Bool(false) => Some(Cow::Borrowed("false")),
            RawValue::Null | RawValue::Composite(_) => None,
        }
    }

    /// Numeric reading of a non-categorical feature, or `None` when the value
    /// carries no usable number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Int(value) => Some(*value as f64),
            RawValue::Float(value) if value.is_finite() => Some(*value),
            RawValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            RawValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

fn float_key(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
        return Some((value as i64).to_string());
    }
    let mut buffer = ryu::Buffer::new();
    Some(buffer.format_finite(value).to_owned())
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(flag) => RawValue::Bool(flag),
            Value::Number(number) => match (number.as_i64(), number.as_f64()) {
                (Some(int), _) => RawValue::Int(int),
                (None, Some(float)) => RawValue::Float(float),
                (None, None) => RawValue::Composite(Value::Number(number)),
            },
            Value::String(text) => RawValue::Text(text),
            other => RawValue::Composite(other),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Int(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// A caller-supplied record: any set of keys, any scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(HashMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Option<RawValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(object: Map<String, Value>) -> Self {
        Self(
            object
                .into_iter()
                .map(|(key, value)| (key, RawValue::from(value)))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_keys_follow_scalar_kind() {
        assert_eq!(RawValue::from("SUV").category_key().as_deref(), Some("SUV"));
        assert_eq!(RawValue::from(3).category_key().as_deref(), Some("3"));
        assert_eq!(RawValue::from(3.0).category_key().as_deref(), Some("3"));
        assert_eq!(RawValue::from(2.5).category_key().as_deref(), Some("2.5"));
        assert_eq!(RawValue::from(true).category_key().as_deref(), Some("true"));
        assert_eq!(RawValue::Null.category_key(), None);
        assert_eq!(RawValue::Composite(json!([1, 2])).category_key(), None);
    }

    #[test]
    fn numeric_reading_is_lenient() {
        assert_eq!(RawValue::from(45).as_number(), Some(45.0));
        assert_eq!(RawValue::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(RawValue::from(false).as_number(), Some(0.0));
        assert_eq!(RawValue::from("twelve").as_number(), None);
        assert_eq!(RawValue::from("NaN").as_number(), None);
        assert_eq!(RawValue::Null.as_number(), None);
    }

    #[test]
    fn json_scalars_keep_their_literal_form() {
        let record: RawRecord = serde_json::from_value(json!({
            "Age": 45,
            "Premium": 45.0,
            "Region": "North",
            "Flag": true,
            "Missing": null,
            "Tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(record.get("Age"), Some(&RawValue::Int(45)));
        assert_eq!(record.get("Premium"), Some(&RawValue::Float(45.0)));
        assert_eq!(record.get("Region"), Some(&RawValue::from("North")));
        assert_eq!(record.get("Missing"), Some(&RawValue::Null));
        assert!(matches!(record.get("Tags"), Some(RawValue::Composite(_))));

        assert_eq!(serde_json::to_value(record.get("Age")).unwrap(), json!(45));
        assert_eq!(serde_json::to_value(record.get("Premium")).unwrap(), json!(45.0));
        assert_eq!(serde_json::to_value(record.get("Tags")).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn json_object_conversion_matches_deserialisation() {
        let body = json!({"Age": 45, "Region": "North", "Ratio": 0.25});
        let converted = match body.clone() {
            Value::Object(map) => RawRecord::from(map),
            _ => unreachable!(),
        };
        let parsed: RawRecord = serde_json::from_value(body).unwrap();
        assert_eq!(converted, parsed);
    }
}
