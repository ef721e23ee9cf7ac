use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::domain::{Feature, FEATURE_COUNT};

/// A single form value. `Unset` travels as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FeatureValue {
    #[default]
    Unset,
    Value(f64),
}

impl FeatureValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            FeatureValue::Unset => None,
            FeatureValue::Value(value) => Some(value),
        }
    }

    pub fn is_set(self) -> bool {
        matches!(self, FeatureValue::Value(_))
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Unset => serializer.serialize_none(),
            FeatureValue::Value(value) => serializer.serialize_f64(*value),
        }
    }
}

/// Body of `POST /predict`: every registry feature, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSnapshot {
    values: [FeatureValue; FEATURE_COUNT],
}

impl FeatureSnapshot {
    pub fn new(values: [FeatureValue; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> FeatureValue {
        self.values[feature.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, FeatureValue)> + '_ {
        Feature::all().map(|feature| (feature, self.get(feature)))
    }

    pub fn unset_count(&self) -> usize {
        self.values.iter().filter(|value| !value.is_set()).count()
    }
}

impl Default for FeatureSnapshot {
    fn default() -> Self {
        Self::new([FeatureValue::Unset; FEATURE_COUNT])
    }
}

impl Serialize for FeatureSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub diagnosis: String,
}

impl PredictionResult {
    /// Probability of malignancy as shown to the user, e.g. `87.32%`.
    pub fn probability_percent(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}
