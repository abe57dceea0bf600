//! House Price Predictor - monotonic gradient boosting for property valuation
//!
//! This crate trains and serves a house price regression pipeline:
//! - Column-wise preprocessing (imputation, scaling, one-hot and ordinal encoding)
//! - A histogram gradient boosting regressor with monotonic constraints
//! - Cross-validated grid search over the regressor's hyperparameters
//! - A single persisted artifact coupling preprocessing to the model
//!
//! # Modules
//!
//! - [`preprocessing`] - Feature classification and the column transform pipeline
//! - [`training`] - Regressor, constraints, cross-validation and grid search
//! - [`inference`] - The trained artifact and the single-record request contract
//! - [`server`] - HTTP server exposing `/predict`
//! - [`cli`] - Command-line interface
//! - [`utils`] - Data loading and sample data

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Utilities
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{PredictorError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PredictorError, Result};

    pub use crate::preprocessing::{
        DataPreprocessor, FeatureClassifier, FeatureGroups, PreprocessingConfig, Record, Table,
    };

    pub use crate::training::{
        GridSearch, HistGradientBoostingConfig, HistGradientBoostingRegressor, KFold,
        Monotonic, MonotonicConstraints, ParamGrid, TrainEngine, TrainingConfig,
    };

    pub use crate::inference::{PredictionRequest, TrainedArtifact};
}
