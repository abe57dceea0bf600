//! Histogram-based gradient boosting for least-squares regression
//!
//! - Features are bucketed into at most 255 bins once, before boosting
//! - Trees grow leaf-wise (best-first) from per-bin gradient histograms
//! - Optional per-feature monotonic constraints: a split that would order its
//!   children against the constraint is rejected, and child values are bounded
//!   by the midpoint of the split so the whole ensemble stays monotonic

use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::constraints::Monotonic;
use super::models::Model;

/// Above this many rows, bin thresholds are computed on a random subsample
const BINNING_SUBSAMPLE: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistGradientBoostingConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub max_depth: Option<usize>,
    pub max_leaf_nodes: usize,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    pub max_bins: usize,
    pub random_state: Option<u64>,
}

impl Default for HistGradientBoostingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 100,
            max_depth: None,
            max_leaf_nodes: 31,
            min_samples_leaf: 20,
            l2_regularization: 0.0,
            max_bins: 255,
            random_state: Some(42),
        }
    }
}

impl HistGradientBoostingConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| PredictorError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", self.learning_rate.to_string(), "must be positive"));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter", "0".to_string(), "must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(invalid("max_depth", "0".to_string(), "must be at least 1"));
        }
        if self.max_leaf_nodes < 2 {
            return Err(invalid("max_leaf_nodes", self.max_leaf_nodes.to_string(), "must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(invalid("min_samples_leaf", "0".to_string(), "must be at least 1"));
        }
        if self.l2_regularization < 0.0 {
            return Err(invalid(
                "l2_regularization",
                self.l2_regularization.to_string(),
                "must be non-negative",
            ));
        }
        if !(2..=255).contains(&self.max_bins) {
            return Err(invalid("max_bins", self.max_bins.to_string(), "must be in 2..=255"));
        }
        Ok(())
    }
}

/// Per-feature bin upper edges. Value `v` falls in the first bin whose edge
/// is `>= v`; values above every edge land in the last bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinMapper {
    thresholds: Vec<Vec<f64>>,
}

impl BinMapper {
    fn fit(x: &Array2<f64>, max_bins: usize, rng: &mut Xoshiro256PlusPlus) -> Self {
        let n = x.nrows();
        let rows: Vec<usize> = if n > BINNING_SUBSAMPLE {
            let mut picked = sample(rng, n, BINNING_SUBSAMPLE).into_vec();
            picked.sort_unstable();
            picked
        } else {
            (0..n).collect()
        };

        let thresholds = (0..x.ncols())
            .map(|f| {
                let mut values: Vec<f64> = rows.iter().map(|&i| x[[i, f]]).collect();
                values.sort_by(|a, b| a.total_cmp(b));
                feature_thresholds(&values, max_bins)
            })
            .collect();

        Self { thresholds }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    fn bin(&self, feature: usize, value: f64) -> u8 {
        self.thresholds[feature].partition_point(|t| *t < value) as u8
    }

    /// Column-major binned copy of `x`
    fn transform(&self, x: &Array2<f64>) -> Vec<Vec<u8>> {
        (0..x.ncols())
            .into_par_iter()
            .map(|f| x.column(f).iter().map(|&v| self.bin(f, v)).collect())
            .collect()
    }
}

/// Midpoints between distinct values, or quantiles when there are more
/// distinct values than bins
fn feature_thresholds(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct: Vec<f64> = sorted.to_vec();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let last = (sorted.len() - 1) as f64;
    let mut edges: Vec<f64> = (1..max_bins)
        .map(|k| {
            let pos = last * k as f64 / max_bins as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        })
        .collect();
    edges.dedup();
    edges
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn predict_row(&self, row: &ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }
}

#[derive(Debug, Clone)]
struct SplitInfo {
    feature: usize,
    bin: usize,
    gain: f64,
    sum_left: f64,
    sum_right: f64,
    value_left: f64,
    value_right: f64,
}

/// An open leaf that can still be split
#[derive(Debug)]
struct Candidate {
    node_id: usize,
    depth: usize,
    split: SplitInfo,
}

struct TreeGrower<'a> {
    binned: &'a [Vec<u8>],
    bins: &'a BinMapper,
    gradients: &'a [f64],
    constraints: &'a [Monotonic],
    config: &'a HistGradientBoostingConfig,
}

impl<'a> TreeGrower<'a> {
    fn leaf_value(&self, sum_gradient: f64, count: usize, lo: f64, hi: f64) -> f64 {
        let value = -sum_gradient / (count as f64 + self.config.l2_regularization);
        value.clamp(lo, hi)
    }

    /// Best split of one node, or `None` if no split improves the loss
    fn find_split(&self, samples: &[usize], sum_gradient: f64, lo: f64, hi: f64) -> Option<SplitInfo> {
        let min_leaf = self.config.min_samples_leaf;
        if samples.len() < 2 * min_leaf {
            return None;
        }
        let parent_value = self.leaf_value(sum_gradient, samples.len(), lo, hi);
        let parent_loss = sum_gradient * parent_value;

        let per_feature: Vec<Option<SplitInfo>> = (0..self.binned.len())
            .into_par_iter()
            .map(|feature| {
                let n_bins = self.bins.n_bins(feature);
                if n_bins < 2 {
                    return None;
                }

                let column = &self.binned[feature];
                let mut hist_grad = vec![0.0f64; n_bins];
                let mut hist_count = vec![0usize; n_bins];
                for &i in samples {
                    let b = column[i] as usize;
                    hist_grad[b] += self.gradients[i];
                    hist_count[b] += 1;
                }

                let constraint = self.constraints.get(feature).copied().unwrap_or(Monotonic::Unconstrained);
                let mut best: Option<SplitInfo> = None;
                let mut sum_left = 0.0;
                let mut n_left = 0;

                for bin in 0..n_bins - 1 {
                    sum_left += hist_grad[bin];
                    n_left += hist_count[bin];
                    let n_right = samples.len() - n_left;
                    if n_left < min_leaf {
                        continue;
                    }
                    if n_right < min_leaf {
                        break;
                    }

                    let sum_right = sum_gradient - sum_left;
                    let value_left = self.leaf_value(sum_left, n_left, lo, hi);
                    let value_right = self.leaf_value(sum_right, n_right, lo, hi);

                    let violates = match constraint {
                        Monotonic::Increasing => value_left > value_right,
                        Monotonic::Decreasing => value_left < value_right,
                        Monotonic::Unconstrained => false,
                    };
                    if violates {
                        continue;
                    }

                    let gain = parent_loss - sum_left * value_left - sum_right * value_right;
                    if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                        best = Some(SplitInfo {
                            feature,
                            bin,
                            gain,
                            sum_left,
                            sum_right,
                            value_left,
                            value_right,
                        });
                    }
                }
                best
            })
            .collect();

        per_feature.into_iter().flatten().fold(None, |best: Option<SplitInfo>, split| match best {
            Some(b) if b.gain >= split.gain => Some(b),
            _ => Some(split),
        })
    }

    /// Grow one tree; returns it with the samples that reached each leaf
    fn grow(&self, root_samples: Vec<usize>) -> (Tree, Vec<(f64, Vec<usize>)>) {
        let lr = self.config.learning_rate;
        let max_depth = self.config.max_depth.unwrap_or(usize::MAX);

        let root_sum: f64 = root_samples.iter().map(|&i| self.gradients[i]).sum();
        let root_value = self.leaf_value(root_sum, root_samples.len(), f64::NEG_INFINITY, f64::INFINITY);

        let mut nodes = vec![TreeNode::Leaf { value: root_value * lr }];
        let mut samples: Vec<Option<Vec<usize>>> = vec![None];
        let mut bounds: Vec<(f64, f64)> = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        let mut candidates: Vec<Candidate> = Vec::new();

        if max_depth > 0 {
            if let Some(split) = self.find_split(&root_samples, root_sum, f64::NEG_INFINITY, f64::INFINITY) {
                candidates.push(Candidate { node_id: 0, depth: 0, split });
            }
        }
        samples[0] = Some(root_samples);

        let mut n_leaves = 1;
        while n_leaves < self.config.max_leaf_nodes && !candidates.is_empty() {
            // Highest gain first; earliest node on ties
            let mut pick = 0;
            for (i, c) in candidates.iter().enumerate() {
                if c.split.gain > candidates[pick].split.gain {
                    pick = i;
                }
            }
            let Candidate { node_id, depth, split } = candidates.remove(pick);

            let parent_samples = samples[node_id].take().unwrap_or_default();
            let column = &self.binned[split.feature];
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = parent_samples
                .into_iter()
                .partition(|&i| (column[i] as usize) <= split.bin);

            let (lo, hi) = bounds[node_id];
            let mid = (split.value_left + split.value_right) / 2.0;
            let (left_bounds, right_bounds) = match self.constraints.get(split.feature) {
                Some(Monotonic::Increasing) => ((lo, mid), (mid, hi)),
                Some(Monotonic::Decreasing) => ((mid, hi), (lo, mid)),
                _ => ((lo, hi), (lo, hi)),
            };

            let left_id = nodes.len();
            let right_id = left_id + 1;
            nodes.push(TreeNode::Leaf { value: split.value_left * lr });
            nodes.push(TreeNode::Leaf { value: split.value_right * lr });
            bounds.push(left_bounds);
            bounds.push(right_bounds);
            nodes[node_id] = TreeNode::Split {
                feature: split.feature,
                threshold: self.bins.thresholds[split.feature][split.bin],
                left: left_id,
                right: right_id,
            };
            n_leaves += 1;

            if depth + 1 < max_depth {
                let children = [
                    (left_id, &left_samples, split.sum_left, left_bounds),
                    (right_id, &right_samples, split.sum_right, right_bounds),
                ];
                for (child_id, child_samples, child_sum, (clo, chi)) in children {
                    if let Some(child_split) = self.find_split(child_samples, child_sum, clo, chi) {
                        candidates.push(Candidate {
                            node_id: child_id,
                            depth: depth + 1,
                            split: child_split,
                        });
                    }
                }
            }

            samples.push(Some(left_samples));
            samples.push(Some(right_samples));
        }

        let leaves = nodes
            .iter()
            .zip(samples)
            .filter_map(|(node, s)| match (node, s) {
                (TreeNode::Leaf { value }, Some(s)) => Some((*value, s)),
                _ => None,
            })
            .collect();

        (Tree { nodes }, leaves)
    }
}

/// Least-squares gradient boosting regressor over binned features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistGradientBoostingRegressor {
    pub config: HistGradientBoostingConfig,
    monotonic_cst: Vec<Monotonic>,
    trees: Vec<Tree>,
    baseline: f64,
    n_features: usize,
    train_rmse: Vec<f64>,
    is_fitted: bool,
}

impl HistGradientBoostingRegressor {
    pub fn new(config: HistGradientBoostingConfig) -> Self {
        Self {
            config,
            monotonic_cst: Vec::new(),
            trees: Vec::new(),
            baseline: 0.0,
            n_features: 0,
            train_rmse: Vec::new(),
            is_fitted: false,
        }
    }

    /// One constraint per input column; empty means unconstrained
    pub fn with_monotonic_cst(mut self, monotonic_cst: Vec<Monotonic>) -> Self {
        self.monotonic_cst = monotonic_cst;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(PredictorError::TrainingError("Empty dataset".into()));
        }
        if y.len() != n {
            return Err(PredictorError::ShapeError {
                expected: format!("{} targets", n),
                actual: format!("{} targets", y.len()),
            });
        }
        if !self.monotonic_cst.is_empty() && self.monotonic_cst.len() != x.ncols() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} monotonic constraints", x.ncols()),
                actual: format!("{} monotonic constraints", self.monotonic_cst.len()),
            });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(PredictorError::TrainingError(
                "inputs contain NaN or infinite values".into(),
            ));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let bins = BinMapper::fit(x, self.config.max_bins, &mut rng);
        let binned = bins.transform(x);

        self.trees.clear();
        self.train_rmse.clear();
        self.n_features = x.ncols();
        self.baseline = y.mean().unwrap_or(0.0);
        let mut predictions = vec![self.baseline; n];

        for iteration in 0..self.config.max_iter {
            let gradients: Vec<f64> = predictions.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
            let grower = TreeGrower {
                binned: &binned,
                bins: &bins,
                gradients: &gradients,
                constraints: &self.monotonic_cst,
                config: &self.config,
            };
            let (tree, leaves) = grower.grow((0..n).collect());

            for (value, samples) in leaves {
                for i in samples {
                    predictions[i] += value;
                }
            }

            let mse = predictions
                .iter()
                .zip(y.iter())
                .map(|(p, t)| (p - t).powi(2))
                .sum::<f64>()
                / n as f64;
            self.train_rmse.push(mse.sqrt());

            if tree.n_leaves() == 1 && iteration > 0 {
                debug!(iteration, "No split improves the loss, boosting stopped early");
                self.trees.push(tree);
                break;
            }
            self.trees.push(tree);
        }

        self.is_fitted = true;
        debug!(
            trees = self.trees.len(),
            train_rmse = self.train_rmse.last().copied().unwrap_or(f64::NAN),
            "Gradient boosting fitted"
        );
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(Array1::from_iter(x.rows().into_iter().map(|row| self.predict_view(&row))))
    }

    /// Predict a single feature vector
    pub fn predict_one(&self, row: &Array1<f64>) -> Result<f64> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        if row.len() != self.n_features {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", row.len()),
            });
        }
        Ok(self.predict_view(&row.view()))
    }

    fn predict_view(&self, row: &ArrayView1<f64>) -> f64 {
        self.baseline + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn n_iter(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn monotonic_cst(&self) -> &[Monotonic] {
        &self.monotonic_cst
    }

    /// Training RMSE after each boosting iteration
    pub fn train_rmse(&self) -> &[f64] {
        &self.train_rmse
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

impl Model for HistGradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        HistGradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        HistGradientBoostingRegressor::predict(self, x)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
