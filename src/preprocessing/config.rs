//! Preprocessing configuration

use serde::{Deserialize, Serialize};
use super::{HandleUnknown, ImputeStrategy, LabelRemap, ScalerType};

/// An ordinal feature and its categories from lowest to highest rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalFeature {
    pub name: String,
    pub categories: Vec<String>,
}

impl OrdinalFeature {
    pub fn new<S: Into<String>>(name: impl Into<String>, categories: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

/// Configuration for data preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Strategy for handling missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Strategy for handling missing nominal and ordinal values
    pub categorical_impute_strategy: ImputeStrategy,

    /// Type of scaler to use for numeric features
    pub scaler_type: ScalerType,

    /// Nominal values unseen at fit time
    pub handle_unknown: HandleUnknown,

    /// Fields encoded by rank instead of one-hot, matched case-sensitively
    pub ordinal_features: Vec<OrdinalFeature>,

    /// Legacy label rewrites applied before fit and before every transform
    pub label_remaps: Vec<LabelRemap>,

    /// Placeholder the serving layer uses for an absent categorical field.
    /// Ordinal features treat it as missing instead of as an unknown rank.
    pub missing_sentinel: Option<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            numeric_impute_strategy: ImputeStrategy::Median,
            categorical_impute_strategy: ImputeStrategy::MostFrequent,
            scaler_type: ScalerType::Standard,
            handle_unknown: HandleUnknown::Ignore,
            ordinal_features: vec![
                OrdinalFeature::new("Condition", ["Needs Renovation", "Good", "New"]),
                OrdinalFeature::new("location", ["Rural", "Downtown", "Suburban", "Urban"]),
                OrdinalFeature::new("garage", ["None", "Carport", "Garage"]),
            ],
            label_remaps: vec![LabelRemap::condition()],
            missing_sentinel: Some("Unknown".to_string()),
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set scaler type
    pub fn with_scaler(mut self, scaler_type: ScalerType) -> Self {
        self.scaler_type = scaler_type;
        self
    }

    /// Builder method to replace the ordinal feature table
    pub fn with_ordinal_features(mut self, features: Vec<OrdinalFeature>) -> Self {
        self.ordinal_features = features;
        self
    }

    /// Builder method to add an ordinal feature
    pub fn with_ordinal(mut self, feature: OrdinalFeature) -> Self {
        self.ordinal_features.retain(|f| f.name != feature.name);
        self.ordinal_features.push(feature);
        self
    }

    /// Builder method to replace the label remaps
    pub fn with_label_remaps(mut self, remaps: Vec<LabelRemap>) -> Self {
        self.label_remaps = remaps;
        self
    }

    pub fn ordinal_feature(&self, name: &str) -> Option<&OrdinalFeature> {
        self.ordinal_features.iter().find(|f| f.name == name)
    }
}
