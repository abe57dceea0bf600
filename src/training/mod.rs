//! Model training module
//!
//! Provides the pieces of a training run:
//! - Histogram gradient boosting regressor with monotonic constraints
//! - Monotonic constraint rules resolved against source fields
//! - K-fold cross-validation and exhaustive grid search
//! - The engine that drives a run end to end

mod config;
mod engine;
mod models;
pub mod constraints;
pub mod cross_validation;
pub mod grid_search;
pub mod hist_gradient_boosting;

pub use config::TrainingConfig;
pub use constraints::{Monotonic, MonotonicConstraints, MonotonicRule};
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use engine::{FittedPipeline, TrainEngine, TrainingReport};
pub use grid_search::{CandidateResult, GridSearch, GridSearchResult, HyperParams, ParamGrid};
pub use hist_gradient_boosting::{HistGradientBoostingConfig, HistGradientBoostingRegressor, Tree, TreeNode};
pub use models::{Model, ModelMetrics};
