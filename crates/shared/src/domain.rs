use std::fmt;

use thiserror::Error;

pub const FEATURE_COUNT: usize = 30;

/// The fixed, ordered set of measurements the predictor expects.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mean radius",
    "mean texture",
    "mean perimeter",
    "mean area",
    "mean smoothness",
    "mean compactness",
    "mean concavity",
    "mean concave points",
    "mean symmetry",
    "mean fractal dimension",
    "radius error",
    "texture error",
    "perimeter error",
    "area error",
    "smoothness error",
    "compactness error",
    "concavity error",
    "concave points error",
    "symmetry error",
    "fractal dimension error",
    "worst radius",
    "worst texture",
    "worst perimeter",
    "worst area",
    "worst smoothness",
    "worst compactness",
    "worst concavity",
    "worst concave points",
    "worst symmetry",
    "worst fractal dimension",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature '{0}'")]
pub struct UnknownFeature(pub String);

/// A registry entry. Only constructible from a valid registry position or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Feature(usize);

impl Feature {
    pub fn all() -> impl Iterator<Item = Feature> {
        (0..FEATURE_COUNT).map(Feature)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        (index < FEATURE_COUNT).then_some(Self(index))
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownFeature> {
        let name = name.trim();
        FEATURE_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(Self)
            .ok_or_else(|| UnknownFeature(name.to_string()))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.0]
    }

    pub fn group(self) -> FeatureGroup {
        match self.0 {
            0..=9 => FeatureGroup::Mean,
            10..=19 => FeatureGroup::Error,
            _ => FeatureGroup::Worst,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureGroup {
    Mean,
    Error,
    Worst,
}

impl FeatureGroup {
    pub const ALL: [FeatureGroup; 3] = [FeatureGroup::Mean, FeatureGroup::Error, FeatureGroup::Worst];

    pub fn title(self) -> &'static str {
        match self {
            FeatureGroup::Mean => "Mean features",
            FeatureGroup::Error => "Standard error features",
            FeatureGroup::Worst => "Worst features",
        }
    }

    pub fn features(self) -> impl Iterator<Item = Feature> {
        Feature::all().filter(move |feature| feature.group() == self)
    }
}

/// One of the four precomputed correlation matrices served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrelationKind {
    Global,
    Mean,
    Worst,
    Error,
}

impl CorrelationKind {
    pub const ALL: [CorrelationKind; 4] = [
        CorrelationKind::Global,
        CorrelationKind::Mean,
        CorrelationKind::Worst,
        CorrelationKind::Error,
    ];

    pub fn index(self) -> usize {
        match self {
            CorrelationKind::Global => 0,
            CorrelationKind::Mean => 1,
            CorrelationKind::Worst => 2,
            CorrelationKind::Error => 3,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            CorrelationKind::Global => "global",
            CorrelationKind::Mean => "mean",
            CorrelationKind::Worst => "worst",
            CorrelationKind::Error => "error",
        }
    }

    /// Endpoint path relative to the backend base URL.
    pub fn path(self) -> String {
        format!("correlation_{}", self.slug())
    }

    pub fn title(self) -> &'static str {
        match self {
            CorrelationKind::Global => "Correlation - Global",
            CorrelationKind::Mean => "Correlation - Mean features",
            CorrelationKind::Worst => "Correlation - Worst features",
            CorrelationKind::Error => "Correlation - Error features",
        }
    }
}

impl fmt::Display for CorrelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
