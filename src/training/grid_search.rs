//! Exhaustive hyperparameter search with k-fold cross-validation

use crate::error::{PredictorError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::cross_validation::{CVResults, CVSplit, KFold};
use super::hist_gradient_boosting::HistGradientBoostingConfig;
use super::models::ModelMetrics;

/// One point of the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub max_depth: Option<usize>,
    pub learning_rate: f64,
    pub max_iter: usize,
}

impl HyperParams {
    /// Overlay these values onto a base regressor configuration
    pub fn apply(&self, base: &HistGradientBoostingConfig) -> HistGradientBoostingConfig {
        base.clone()
            .with_max_depth(self.max_depth)
            .with_learning_rate(self.learning_rate)
            .with_max_iter(self.max_iter)
    }

    /// Values of a base configuration
    pub fn from_config(config: &HistGradientBoostingConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            max_iter: config.max_iter,
        }
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "max_depth={}, learning_rate={}, max_iter={}",
            depth, self.learning_rate, self.max_iter
        )
    }
}

/// Cartesian grid; iteration order is max_depth, then learning_rate, then max_iter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub max_depth: Vec<Option<usize>>,
    pub learning_rate: Vec<f64>,
    pub max_iter: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            max_depth: vec![None, Some(10), Some(20)],
            learning_rate: vec![0.05, 0.1, 0.2],
            max_iter: vec![200, 500],
        }
    }
}

impl ParamGrid {
    /// A grid holding a single point
    pub fn single(params: &HyperParams) -> Self {
        Self {
            max_depth: vec![params.max_depth],
            learning_rate: vec![params.learning_rate],
            max_iter: vec![params.max_iter],
        }
    }

    pub fn len(&self) -> usize {
        self.max_depth.len() * self.learning_rate.len() * self.max_iter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn candidates(&self) -> Vec<HyperParams> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &learning_rate in &self.learning_rate {
                for &max_iter in &self.max_iter {
                    out.push(HyperParams {
                        max_depth,
                        learning_rate,
                        max_iter,
                    });
                }
            }
        }
        out
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(PredictorError::ConfigError(
                "param_grid has an empty axis".to_string(),
            ));
        }
        let base = HistGradientBoostingConfig::default();
        for params in self.candidates() {
            params.apply(&base).validate()?;
        }
        Ok(())
    }
}

/// Cross-validated scores of one grid point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: HyperParams,
    pub fold_metrics: Vec<ModelMetrics>,
    pub rmse: CVResults,
    pub mean_mae: f64,
    pub mean_r2: f64,
    /// 1 is best
    pub rank: usize,
}

impl CandidateResult {
    fn from_folds(params: HyperParams, fold_metrics: Vec<ModelMetrics>) -> Self {
        let n = fold_metrics.len().max(1) as f64;
        let rmse = CVResults::from_scores(fold_metrics.iter().map(|m| m.rmse).collect());
        let mean_mae = fold_metrics.iter().map(|m| m.mae).sum::<f64>() / n;
        let mean_r2 = fold_metrics.iter().map(|m| m.r2).sum::<f64>() / n;
        Self {
            params,
            fold_metrics,
            rmse,
            mean_mae,
            mean_r2,
            rank: 0,
        }
    }

    /// Selection score, higher is better
    pub fn score(&self) -> f64 {
        -self.rmse.mean_score
    }
}

/// Outcome of a full search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
}

impl GridSearchResult {
    pub fn best(&self) -> &CandidateResult {
        &self.candidates[self.best_index]
    }

    pub fn best_params(&self) -> &HyperParams {
        &self.best().params
    }

    pub fn best_rmse(&self) -> f64 {
        self.best().rmse.mean_score
    }
}

/// Runs every (candidate, fold) evaluation and ranks candidates by mean RMSE
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    cv: KFold,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, cv: KFold) -> Self {
        Self { grid, cv }
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Evaluate all combinations. `evaluate` fits on the split's training
    /// rows and scores the held-out rows. Evaluations run in parallel on the
    /// current rayon pool; the first failure aborts the search.
    pub fn run<F>(&self, n_samples: usize, evaluate: F) -> Result<GridSearchResult>
    where
        F: Fn(&HyperParams, &CVSplit) -> Result<ModelMetrics> + Sync,
    {
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(PredictorError::ConfigError("empty parameter grid".to_string()));
        }
        let splits = self.cv.split(n_samples)?;

        info!(
            candidates = candidates.len(),
            folds = splits.len(),
            fits = candidates.len() * splits.len(),
            "Starting grid search"
        );

        let jobs: Vec<(usize, &CVSplit)> = (0..candidates.len())
            .flat_map(|c| splits.iter().map(move |s| (c, s)))
            .collect();

        let metrics: Vec<ModelMetrics> = jobs
            .par_iter()
            .map(|&(c, split)| {
                let params = &candidates[c];
                let fold_failure = |reason: String| {
                    PredictorError::TrainingError(format!(
                        "candidate {} ({}) failed on fold {}: {}",
                        c, params, split.fold_idx, reason
                    ))
                };
                let m = evaluate(params, split).map_err(|e| fold_failure(e.to_string()))?;
                if !m.rmse.is_finite() {
                    return Err(fold_failure(format!("non-finite RMSE {}", m.rmse)));
                }
                Ok(m)
            })
            .collect::<Result<Vec<_>>>()?;

        let n_folds = splits.len();
        let mut results: Vec<CandidateResult> = candidates
            .into_iter()
            .zip(metrics.chunks(n_folds))
            .map(|(params, folds)| CandidateResult::from_folds(params, folds.to_vec()))
            .collect();

        // Stable sort keeps grid order among equal scores
        let mut order: Vec<usize> = (0..results.len()).collect();
        order.sort_by(|&a, &b| results[a].rmse.mean_score.total_cmp(&results[b].rmse.mean_score));
        for (rank, &idx) in order.iter().enumerate() {
            results[idx].rank = rank + 1;
        }
        let best_index = order[0];

        for r in &results {
            info!(
                params = %r.params,
                mean_rmse = r.rmse.mean_score,
                std_rmse = r.rmse.std_score,
                mean_mae = r.mean_mae,
                mean_r2 = r.mean_r2,
                rank = r.rank,
                "Candidate scored"
            );
        }

        let result = GridSearchResult {
            candidates: results,
            best_index,
        };
        info!(
            best = %result.best_params(),
            best_rmse = result.best_rmse(),
            "Grid search finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_order() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 18);
        assert_eq!(
            candidates[0],
            HyperParams { max_depth: None, learning_rate: 0.05, max_iter: 200 }
        );
        assert_eq!(
            candidates[1],
            HyperParams { max_depth: None, learning_rate: 0.05, max_iter: 500 }
        );
        assert_eq!(
            candidates[2],
            HyperParams { max_depth: None, learning_rate: 0.1, max_iter: 200 }
        );
        assert_eq!(candidates[17].max_depth, Some(20));
    }

    fn metrics(rmse: f64) -> ModelMetrics {
        ModelMetrics { rmse, mse: rmse * rmse, ..Default::default() }
    }

    #[test]
    fn test_picks_lowest_rmse() {
        let grid = ParamGrid {
            max_depth: vec![None],
            learning_rate: vec![0.05, 0.1, 0.2],
            max_iter: vec![10],
        };
        let search = GridSearch::new(grid, KFold::new(3));
        let result = search
            .run(9, |params, _| Ok(metrics((params.learning_rate - 0.1).abs() + 1.0)))
            .unwrap();

        assert_eq!(result.best_params().learning_rate, 0.1);
        assert_eq!(result.best().rank, 1);
        assert_eq!(result.best().fold_metrics.len(), 3);
        assert!((result.best_rmse() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let grid = ParamGrid {
            max_depth: vec![None, Some(3)],
            learning_rate: vec![0.1],
            max_iter: vec![10, 20],
        };
        let search = GridSearch::new(grid, KFold::new(2));
        let result = search.run(4, |_, _| Ok(metrics(5.0))).unwrap();
        assert_eq!(result.best_index, 0);
    }

    #[test]
    fn test_fold_failure_aborts() {
        let search = GridSearch::new(ParamGrid::default(), KFold::new(3));
        let err = search
            .run(30, |params, split| {
                if params.max_iter == 500 && split.fold_idx == 2 {
                    Err(PredictorError::TrainingError("boom".to_string()))
                } else {
                    Ok(metrics(1.0))
                }
            })
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("fold 2"), "{}", message);
        assert!(message.contains("max_iter=500"), "{}", message);
    }

    #[test]
    fn test_non_finite_score_fails() {
        let search = GridSearch::new(ParamGrid::single(&HyperParams::from_config(&Default::default())), KFold::new(2));
        assert!(search.run(4, |_, _| Ok(metrics(f64::NAN))).is_err());
    }

    #[test]
    fn test_apply_overrides_only_grid_values() {
        let base = HistGradientBoostingConfig::default().with_min_samples_leaf(7);
        let params = HyperParams { max_depth: Some(10), learning_rate: 0.2, max_iter: 500 };
        let config = params.apply(&base);
        assert_eq!(config.max_depth, Some(10));
        assert_eq!(config.learning_rate, 0.2);
        assert_eq!(config.max_iter, 500);
        assert_eq!(config.min_samples_leaf, 7);
    }
}
