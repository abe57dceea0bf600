//! Monotonic constraints derived from source field names

use crate::error::{PredictorError, Result};
use crate::preprocessing::FeatureSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Required direction of the model output along one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Monotonic {
    Increasing,
    Decreasing,
    Unconstrained,
}

impl Monotonic {
    /// +1, -1 or 0
    pub fn sign(&self) -> i8 {
        match self {
            Monotonic::Increasing => 1,
            Monotonic::Decreasing => -1,
            Monotonic::Unconstrained => 0,
        }
    }

    pub fn from_sign(sign: i8) -> Result<Self> {
        match sign {
            1 => Ok(Monotonic::Increasing),
            -1 => Ok(Monotonic::Decreasing),
            0 => Ok(Monotonic::Unconstrained),
            other => Err(PredictorError::InvalidParameter {
                name: "monotonic_cst".to_string(),
                value: other.to_string(),
                reason: "must be -1, 0 or 1".to_string(),
            }),
        }
    }
}

impl fmt::Display for Monotonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sign())
    }
}

/// Source fields whose name contains `pattern` (case-insensitive) get `direction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonotonicRule {
    pub pattern: String,
    pub direction: Monotonic,
}

impl MonotonicRule {
    pub fn new(pattern: impl Into<String>, direction: Monotonic) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            direction,
        }
    }

    pub fn increasing(pattern: impl Into<String>) -> Self {
        Self::new(pattern, Monotonic::Increasing)
    }

    pub fn matches(&self, field: &str) -> bool {
        field.to_lowercase().contains(&self.pattern)
    }

    /// Physical attributes that should never lower the price
    pub fn house_defaults() -> Vec<Self> {
        ["area", "bedrooms", "bathrooms", "floors", "yearbuilt"]
            .into_iter()
            .map(Self::increasing)
            .collect()
    }
}

/// Feature name to constraint binding, in transform output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonotonicConstraints {
    bindings: Vec<(String, Monotonic)>,
}

impl MonotonicConstraints {
    /// Resolve the rules against each feature's source field. The first
    /// matching rule wins; features without a match are unconstrained.
    pub fn from_features(features: &[FeatureSpec], rules: &[MonotonicRule]) -> Self {
        let bindings = features
            .iter()
            .map(|feature| {
                let direction = rules
                    .iter()
                    .find(|rule| rule.matches(&feature.source))
                    .map(|rule| rule.direction)
                    .unwrap_or(Monotonic::Unconstrained);
                (feature.name.clone(), direction)
            })
            .collect();
        Self { bindings }
    }

    pub fn get(&self, feature: &str) -> Option<Monotonic> {
        self.bindings
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, direction)| *direction)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Monotonic)> {
        self.bindings.iter().map(|(name, d)| (name.as_str(), *d))
    }

    /// Names of the constrained features
    pub fn constrained(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, d)| *d != Monotonic::Unconstrained)
            .map(|(name, _)| name)
            .collect()
    }

    /// Positional vector for a regressor trained on `feature_names`
    pub fn to_positional(&self, feature_names: &[String]) -> Result<Vec<Monotonic>> {
        if feature_names.len() != self.bindings.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} constraints", feature_names.len()),
                actual: format!("{} constraints", self.bindings.len()),
            });
        }

        feature_names
            .iter()
            .zip(self.bindings.iter())
            .map(|(expected, (name, direction))| {
                if expected == name {
                    Ok(*direction)
                } else {
                    Err(PredictorError::ValidationError(format!(
                        "constraint bound to '{}' but feature is '{}'",
                        name, expected
                    )))
                }
            })
            .collect()
    }

    /// Compact `[1, 0, ...]` form for logs
    pub fn signs(&self) -> Vec<i8> {
        self.bindings.iter().map(|(_, d)| d.sign()).collect()
    }
}
