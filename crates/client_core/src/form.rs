//! Form input state: one value per registry feature, coerced from raw text.

use shared::{
    domain::{Feature, FEATURE_COUNT},
    protocol::{FeatureSnapshot, FeatureValue},
};

/// Coerce raw input into a feature value. Anything that is not a finite number
/// (empty, garbage, `NaN`, `inf`) becomes `Unset`.
pub fn parse_feature_value(raw: &str) -> FeatureValue {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => FeatureValue::Value(value),
        _ => FeatureValue::Unset,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormStateStore {
    values: [FeatureValue; FEATURE_COUNT],
}

impl FormStateStore {
    pub fn new() -> Self {
        Self {
            values: [FeatureValue::Unset; FEATURE_COUNT],
        }
    }

    pub fn set_field(&mut self, feature: Feature, raw: &str) -> FeatureValue {
        let value = parse_feature_value(raw);
        self.values[feature.index()] = value;
        value
    }

    pub fn value(&self, feature: Feature) -> FeatureValue {
        self.values[feature.index()]
    }

    pub fn snapshot(&self) -> FeatureSnapshot {
        FeatureSnapshot::new(self.values)
    }

    pub fn missing(&self) -> Vec<Feature> {
        Feature::all()
            .filter(|feature| !self.value(*feature).is_set())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|value| value.is_set())
    }

    pub fn reset(&mut self) {
        self.values = [FeatureValue::Unset; FEATURE_COUNT];
    }
}

impl Default for FormStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
