use crate::forest::FeatureAttribution;
use ahash::AHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Offline evaluation of the trained model, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelQuality {
    pub mae: f64,
    pub adjusted_r2: f64,
}

/// Actual-vs-predicted pairs from model evaluation, returned verbatim.
///
/// Keeps insertion order. Re-inserting an actual value keeps its original
/// position and replaces its prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCurve {
    points: Vec<(f64, f64)>,
}

impl ReferenceCurve {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut positions: AHashMap<u64, usize> = AHashMap::new();
        let mut ordered: Vec<(f64, f64)> = Vec::new();
        for (actual, predicted) in points {
            // -0.0 and 0.0 are the same key.
            let actual = if actual == 0.0 { 0.0 } else { actual };
            match positions.get(&actual.to_bits()) {
                Some(&index) => ordered[index].1 = predicted,
                None => {
                    positions.insert(actual.to_bits(), ordered.len());
                    ordered.push((actual, predicted));
                }
            }
        }
        Self { points: ordered }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

/// Serialises as a JSON object keyed by the actual value written the way
/// Python's `str(float)` writes it.
impl Serialize for ReferenceCurve {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.points.len()))?;
        let mut buffer = ryu::Buffer::new();
        for &(actual, predicted) in &self.points {
            map.serialize_entry(&float_key(actual, &mut buffer), &predicted)?;
        }
        map.end()
    }
}

/// Shortest round-trip digits, in scientific form below 1e-4 and from 1e16
/// up, with a signed exponent of at least two digits (`1e+16`, `2.5e-07`).
fn float_key(value: f64, buffer: &mut ryu::Buffer) -> String {
    let text = buffer.format(value);
    if !value.is_finite() {
        return text.to_string();
    }

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (mantissa, exponent) = match unsigned.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = format!("{whole}{fraction}");
    let leading_zeros = all_digits.len() - all_digits.trim_start_matches('0').len();
    let digits = all_digits.trim_matches('0');
    if digits.is_empty() {
        return format!("{sign}0.0");
    }

    // value = 0.<digits> * 10^point
    let point = whole.len() as i32 - leading_zeros as i32 + exponent;
    if (-3..=16).contains(&point) {
        return text.to_string();
    }

    let (first, rest) = digits.split_at(1);
    let power = point - 1;
    let direction = if power < 0 { '-' } else { '+' };
    if rest.is_empty() {
        format!("{sign}{first}e{direction}{:02}", power.abs())
    } else {
        format!("{sign}{first}.{rest}e{direction}{:02}", power.abs())
    }
}

/// Body of a successful prediction.
#[derive(Debug, Serialize)]
pub struct PredictionResponse<'a> {
    pub prediction: f64,
    pub mae: f64,
    pub adjusted_r2: f64,
    pub top_5_shap_values: Vec<FeatureAttribution>,
    pub all_actual_vs_predicted: &'a ReferenceCurve,
}

/// Body of the liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
}

pub const HEALTHY: HealthStatus = HealthStatus {
    status: "running",
    message: "Claim Severity API is live",
};

/// Combines a prediction and its explanation with the process-wide constants.
pub fn assemble<'a>(
    prediction: f64,
    explanation: Vec<FeatureAttribution>,
    quality: &ModelQuality,
    curve: &'a ReferenceCurve,
) -> PredictionResponse<'a> {
    PredictionResponse {
        prediction,
        mae: quality.mae,
        adjusted_r2: quality.adjusted_r2,
        top_5_shap_values: explanation,
        all_actual_vs_predicted: curve,
    }
}
