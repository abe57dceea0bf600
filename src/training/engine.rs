//! Training engine implementation

use crate::error::{PredictorError, Result};
use crate::inference::{ArtifactMetadata, TrainedArtifact};
use crate::preprocessing::{DataPreprocessor, Table};
use super::{
    constraints::MonotonicConstraints,
    cross_validation::{CVSplit, KFold},
    grid_search::{CandidateResult, GridSearch, GridSearchResult, HyperParams, ParamGrid},
    hist_gradient_boosting::HistGradientBoostingRegressor,
    models::ModelMetrics,
    TrainingConfig,
};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// A pipeline, its constraint binding and the regressor, fitted together
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub preprocessor: DataPreprocessor,
    pub constraints: MonotonicConstraints,
    pub model: HistGradientBoostingRegressor,
}

impl FittedPipeline {
    pub fn predict(&self, table: &Table) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(table)?;
        self.model.predict(&x)
    }
}

/// Summary of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_samples: usize,
    pub feature_names: Vec<String>,
    pub constraint_signs: Vec<i8>,
    /// CV scores of the regressor's default settings, when requested
    pub baseline: Option<CandidateResult>,
    pub search: GridSearchResult,
    pub training_time_secs: f64,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train from a CSV file with a header row
    pub fn train_csv(&self, path: impl AsRef<Path>) -> Result<(TrainedArtifact, TrainingReport)> {
        let table = self.config.data_loader().load_table(path)?;
        self.train_table(table)
    }

    pub fn train_dataframe(&self, df: &DataFrame) -> Result<(TrainedArtifact, TrainingReport)> {
        self.train_table(Table::from_dataframe(df)?)
    }

    /// Run the full job: drop identifiers, split off the target, report the
    /// baseline, search the grid and refit the winner on every row.
    pub fn train_table(&self, table: Table) -> Result<(TrainedArtifact, TrainingReport)> {
        let start = Instant::now();
        self.config.validate()?;

        let (x, y) = self.prepare(table)?;
        info!(rows = x.n_rows(), columns = x.n_columns(), "Training data prepared");

        self.log_feature_layout(&x)?;

        let cv = KFold::new(self.config.cv_folds)
            .with_shuffle(self.config.shuffle)
            .with_random_state(self.config.random_state);
        let evaluate = |params: &HyperParams, split: &CVSplit| self.evaluate_fold(&x, &y, params, split);

        let (baseline, search) = self.run_in_pool(|| {
            let baseline = if self.config.baseline_cv {
                let grid = ParamGrid::single(&HyperParams::from_config(&self.config.regressor));
                let result = GridSearch::new(grid, cv.clone()).run(x.n_rows(), &evaluate)?;
                let best = result.best().clone();
                for (fold, m) in best.fold_metrics.iter().enumerate() {
                    info!(fold, rmse = m.rmse, mae = m.mae, r2 = m.r2, "Baseline fold");
                }
                info!(
                    mean_rmse = best.rmse.mean_score,
                    mean_mae = best.mean_mae,
                    mean_r2 = best.mean_r2,
                    "Baseline cross-validation"
                );
                Some(best)
            } else {
                None
            };

            let search = GridSearch::new(self.config.param_grid.clone(), cv.clone())
                .run(x.n_rows(), &evaluate)?;
            Ok((baseline, search))
        })?;

        let best_params = search.best_params().clone();
        info!(params = %best_params, cv_rmse = search.best_rmse(), "Refitting best candidate on all rows");
        let fitted = self.fit_pipeline(&x, &y, &best_params)?;

        let metadata = ArtifactMetadata::new(&self.config.target_column, x.n_rows())
            .with_cv_rmse(search.best_rmse());
        let report = TrainingReport {
            n_samples: x.n_rows(),
            feature_names: fitted.preprocessor.feature_names(),
            constraint_signs: fitted.constraints.signs(),
            baseline,
            search,
            training_time_secs: start.elapsed().as_secs_f64(),
        };
        let artifact = TrainedArtifact::new(fitted, best_params, metadata)?;

        info!(secs = report.training_time_secs, "Training finished");
        Ok((artifact, report))
    }

    /// Drop configured columns and split off the numeric target
    pub fn prepare(&self, mut table: Table) -> Result<(Table, Vec<f64>)> {
        if table.is_empty() {
            return Err(PredictorError::DataError("training table has no rows".to_string()));
        }

        let dropped = table.drop_columns(&self.config.drop_columns);
        if !dropped.is_empty() {
            info!(columns = ?dropped, "Dropped columns");
        }
        let y = table.split_target(&self.config.target_column)?;
        if table.n_columns() == 0 {
            return Err(PredictorError::DataError(
                "no feature columns left after removing target and dropped columns".to_string(),
            ));
        }
        Ok((table, y))
    }

    /// Fit a preprocessor on every row and log its groups, features and
    /// constraint signs. Nothing here is kept; each fold refits its own.
    pub fn log_feature_layout(&self, x: &Table) -> Result<(DataPreprocessor, MonotonicConstraints)> {
        let mut preprocessor = DataPreprocessor::with_config(self.config.preprocessing.clone());
        preprocessor.fit(x)?;
        let constraints =
            MonotonicConstraints::from_features(preprocessor.feature_specs(), &self.config.monotonic_rules);

        let groups = preprocessor.groups();
        info!(
            numeric = ?groups.numeric,
            nominal = ?groups.nominal,
            ordinal = ?groups.ordinal.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            "Feature groups"
        );
        info!(
            features = ?preprocessor.feature_names(),
            constraints = ?constraints.signs(),
            "Transformed features and monotonic constraints"
        );
        Ok((preprocessor, constraints))
    }

    /// Fit the preprocessor, derive constraints from its features and fit
    /// the regressor with `params`
    pub fn fit_pipeline(&self, x: &Table, y: &[f64], params: &HyperParams) -> Result<FittedPipeline> {
        let mut preprocessor = DataPreprocessor::with_config(self.config.preprocessing.clone());
        let features = preprocessor.fit_transform(x)?;

        let constraints =
            MonotonicConstraints::from_features(preprocessor.feature_specs(), &self.config.monotonic_rules);
        let monotonic_cst = constraints.to_positional(&preprocessor.feature_names())?;

        let mut model = HistGradientBoostingRegressor::new(params.apply(&self.config.base_regressor()))
            .with_monotonic_cst(monotonic_cst);
        model.fit(&features, &Array1::from(y.to_vec()))?;

        Ok(FittedPipeline {
            preprocessor,
            constraints,
            model,
        })
    }

    /// Fit on the split's training rows and score its held-out rows
    pub fn evaluate_fold(
        &self,
        x: &Table,
        y: &[f64],
        params: &HyperParams,
        split: &CVSplit,
    ) -> Result<ModelMetrics> {
        let start = Instant::now();
        let x_train = x.select_rows(&split.train_indices);
        let y_train: Vec<f64> = split.train_indices.iter().map(|&i| y[i]).collect();
        let fitted = self.fit_pipeline(&x_train, &y_train, params)?;

        let x_test = x.select_rows(&split.test_indices);
        let y_test: Array1<f64> = split.test_indices.iter().map(|&i| y[i]).collect();
        let y_pred = fitted.predict(&x_test)?;

        let mut metrics = ModelMetrics::compute_regression(&y_test, &y_pred);
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        Ok(metrics)
    }

    fn run_in_pool<T, F>(&self, job: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        match self.config.n_jobs {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| PredictorError::TrainingError(e.to_string()))?;
                pool.install(job)
            }
            None => job(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sample_houses;
    use crate::training::Monotonic;

    fn quick_config() -> TrainingConfig {
        TrainingConfig::default()
            .with_cv_folds(3)
            .with_param_grid(ParamGrid {
                max_depth: vec![None, Some(3)],
                learning_rate: vec![0.1],
                max_iter: vec![20],
            })
            .with_baseline_cv(false)
    }

    #[test]
    fn test_prepare_drops_id_and_target() {
        let df = sample_houses(50, 1).unwrap();
        let engine = TrainEngine::new(quick_config());
        let (x, y) = engine.prepare(Table::from_dataframe(&df).unwrap()).unwrap();

        assert_eq!(y.len(), 50);
        assert!(!x.has_column("Id"));
        assert!(!x.has_column("Price"));
    }

    #[test]
    fn test_missing_target_fails() {
        let df = sample_houses(20, 1).unwrap();
        let engine = TrainEngine::new(quick_config().with_target("SalePrice"));
        assert!(matches!(
            engine.train_dataframe(&df),
            Err(PredictorError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_fit_pipeline_constraints_match_features() {
        let df = sample_houses(120, 2).unwrap();
        let engine = TrainEngine::new(quick_config());
        let (x, y) = engine.prepare(Table::from_dataframe(&df).unwrap()).unwrap();

        let params = HyperParams { max_depth: None, learning_rate: 0.1, max_iter: 10 };
        let fitted = engine.fit_pipeline(&x, &y, &params).unwrap();

        assert_eq!(fitted.constraints.len(), fitted.preprocessor.n_features());
        assert_eq!(fitted.model.monotonic_cst().len(), fitted.preprocessor.n_features());
        assert!(fitted.constraints.get("num__Area").is_some());
    }

    #[test]
    fn test_feature_layout_needs_no_regressor() {
        let df = sample_houses(60, 4).unwrap();
        let engine = TrainEngine::new(quick_config());
        let (x, _) = engine.prepare(Table::from_dataframe(&df).unwrap()).unwrap();

        let (preprocessor, constraints) = engine.log_feature_layout(&x).unwrap();
        assert!(preprocessor.is_fitted());
        assert_eq!(constraints.len(), preprocessor.n_features());
        assert_eq!(constraints.get("num__Area"), Some(Monotonic::Increasing));
    }

    #[test]
    fn test_train_table_end_to_end() {
        let df = sample_houses(150, 3).unwrap();
        let engine = TrainEngine::new(quick_config().with_n_jobs(2));
        let (artifact, report) = engine.train_dataframe(&df).unwrap();

        assert_eq!(report.search.candidates.len(), 2);
        assert_eq!(report.constraint_signs.len(), report.feature_names.len());
        assert!(report.search.best_rmse().is_finite());
        assert_eq!(artifact.feature_names(), report.feature_names);
    }
}
