//! Data preprocessing module
//!
//! Turns raw house records into model-ready feature vectors:
//! - Legacy label remapping
//! - Numeric / nominal / ordinal feature detection
//! - Missing value imputation
//! - Standard scaling of numeric features
//! - One-hot and ordinal encoding of categorical features

mod classifier;
mod config;
mod encoder;
mod imputer;
mod pipeline;
mod remap;
mod scaler;
mod table;

pub use classifier::{FeatureClassifier, FeatureGroup, FeatureGroups};
pub use config::{OrdinalFeature, PreprocessingConfig};
pub use encoder::{HandleUnknown, OneHotEncoder, OrdinalEncoder};
pub use imputer::{ImputeStrategy, ImputeValue, Imputer};
pub use pipeline::{DataPreprocessor, FeatureSpec};
pub use remap::LabelRemap;
pub use scaler::{Scaler, ScalerParams, ScalerType};
pub use table::{ColumnData, FieldValue, Record, Table};

use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_serialize() {
        let dtype = ColumnType::Numeric;
        let json = serde_json::to_string(&dtype).unwrap();
        assert_eq!(json, "\"Numeric\"");
    }
}
