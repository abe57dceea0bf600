//! Training job configuration

use crate::error::{PredictorError, Result};
use crate::preprocessing::PreprocessingConfig;
use crate::utils::DataLoader;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::constraints::MonotonicRule;
use super::grid_search::ParamGrid;
use super::hist_gradient_boosting::HistGradientBoostingConfig;

/// Configuration for a full training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Column holding the sale price
    pub target_column: String,
    /// Identifier columns removed before training
    pub drop_columns: Vec<String>,
    /// Number of cross-validation folds
    pub cv_folds: usize,
    /// Shuffle rows before assigning folds
    pub shuffle: bool,
    /// Seed for fold assignment and the regressor
    pub random_state: u64,
    /// Hyperparameter grid searched with cross-validation
    pub param_grid: ParamGrid,
    /// Regressor settings not covered by the grid
    pub regressor: HistGradientBoostingConfig,
    pub preprocessing: PreprocessingConfig,
    /// Source-field patterns that force a monotonic response
    pub monotonic_rules: Vec<MonotonicRule>,
    /// Worker threads for the search; `None` uses the global rayon pool
    pub n_jobs: Option<usize>,
    /// Report CV metrics of the default regressor before the search
    pub baseline_cv: bool,
    /// CSV rows scanned to infer column types; `None` scans the whole file
    pub infer_schema_length: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "Price".to_string(),
            drop_columns: vec!["Id".to_string()],
            cv_folds: 10,
            shuffle: true,
            random_state: 42,
            param_grid: ParamGrid::default(),
            regressor: HistGradientBoostingConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            monotonic_rules: MonotonicRule::house_defaults(),
            n_jobs: None,
            baseline_cv: true,
            infer_schema_length: None,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_param_grid(mut self, grid: ParamGrid) -> Self {
        self.param_grid = grid;
        self
    }

    pub fn with_regressor(mut self, regressor: HistGradientBoostingConfig) -> Self {
        self.regressor = regressor;
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_monotonic_rules(mut self, rules: Vec<MonotonicRule>) -> Self {
        self.monotonic_rules = rules;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_baseline_cv(mut self, enabled: bool) -> Self {
        self.baseline_cv = enabled;
        self
    }

    /// CSV loader honouring this run's schema scan length
    pub fn data_loader(&self) -> DataLoader {
        DataLoader::new().with_infer_schema_length(self.infer_schema_length)
    }

    /// Regressor settings seeded from this run
    pub fn base_regressor(&self) -> HistGradientBoostingConfig {
        HistGradientBoostingConfig {
            random_state: Some(self.random_state),
            ..self.regressor.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(PredictorError::ConfigError("target_column is empty".to_string()));
        }
        if self.drop_columns.iter().any(|c| *c == self.target_column) {
            return Err(PredictorError::ConfigError(format!(
                "target column '{}' is also listed in drop_columns",
                self.target_column
            )));
        }
        if self.cv_folds < 2 {
            return Err(PredictorError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(PredictorError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        if self.infer_schema_length == Some(0) {
            return Err(PredictorError::ConfigError(
                "infer_schema_length must be at least 1".to_string(),
            ));
        }
        self.param_grid.validate()?;
        self.regressor.validate()
    }

    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
