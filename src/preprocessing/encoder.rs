//! Categorical encoders

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::config::OrdinalFeature;
use super::table::{ColumnData, Table};

/// What to do with a category not seen at fit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleUnknown {
    /// Emit an all-zero indicator block
    Ignore,
    /// Fail with `UnknownCategory`
    Error,
}

/// One-hot encoder over a sorted fit-time vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: HandleUnknown,
    categories: HashMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: HandleUnknown) -> Self {
        Self {
            handle_unknown,
            categories: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Learn each column's vocabulary. Columns must already be imputed.
    pub fn fit(&mut self, table: &Table, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let values = categorical_values(table, col_name)?;
            let vocabulary: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
            self.categories.insert(
                col_name.to_string(),
                vocabulary.into_iter().map(str::to_string).collect(),
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Sorted vocabulary of a fitted column
    pub fn categories(&self, column: &str) -> Result<&[String]> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        self.categories
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| PredictorError::FeatureNotFound(column.to_string()))
    }

    /// Append the indicator block for `value` to `out`
    pub fn encode_into(&self, column: &str, value: &str, out: &mut Vec<f64>) -> Result<()> {
        let vocabulary = self.categories(column)?;
        let hit = vocabulary.binary_search_by(|c| c.as_str().cmp(value)).ok();

        if hit.is_none() && self.handle_unknown == HandleUnknown::Error {
            return Err(PredictorError::UnknownCategory {
                field: column.to_string(),
                value: value.to_string(),
            });
        }

        out.extend((0..vocabulary.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        Ok(())
    }

    /// Number of indicator columns a field expands to
    pub fn width(&self, column: &str) -> Result<usize> {
        Ok(self.categories(column)?.len())
    }
}

/// Fitted state of one ordinal field
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrdinalState {
    ranks: HashMap<String, usize>,
    fill_rank: usize,
}

/// Maps ordered categories to their rank index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    features: Vec<OrdinalFeature>,
    missing_sentinel: Option<String>,
    states: HashMap<String, OrdinalState>,
    is_fitted: bool,
}

impl OrdinalEncoder {
    pub fn new(features: Vec<OrdinalFeature>, missing_sentinel: Option<String>) -> Self {
        Self {
            features,
            missing_sentinel,
            states: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Validate training labels and freeze each field's most frequent rank.
    /// Ties go to the lowest rank.
    pub fn fit(&mut self, table: &Table) -> Result<&mut Self> {
        for feature in &self.features {
            let values = categorical_values(table, &feature.name)?;
            let ranks: HashMap<String, usize> = feature
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), i))
                .collect();

            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for value in values.iter().flatten() {
                if self.is_sentinel(value) {
                    continue;
                }
                let rank = ranks.get(value).ok_or_else(|| PredictorError::UnknownCategory {
                    field: feature.name.clone(),
                    value: value.clone(),
                })?;
                *counts.entry(*rank).or_insert(0) += 1;
            }

            let fill_rank = counts
                .iter()
                .fold(None::<(usize, usize)>, |best, (&rank, &count)| match best {
                    Some((_, best_count)) if best_count >= count => best,
                    _ => Some((rank, count)),
                })
                .map(|(rank, _)| rank)
                .ok_or_else(|| {
                    PredictorError::PreprocessingError(format!(
                        "ordinal column '{}' has no observed values",
                        feature.name
                    ))
                })?;

            self.states
                .insert(feature.name.clone(), OrdinalState { ranks, fill_rank });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Rank of `value`; missing values and the sentinel take the fill rank.
    pub fn encode(&self, column: &str, value: Option<&str>) -> Result<f64> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        let state = self
            .states
            .get(column)
            .ok_or_else(|| PredictorError::FeatureNotFound(column.to_string()))?;

        let rank = match value {
            None => state.fill_rank,
            Some(v) if self.is_sentinel(v) => state.fill_rank,
            Some(v) => *state.ranks.get(v).ok_or_else(|| PredictorError::UnknownCategory {
                field: column.to_string(),
                value: v.to_string(),
            })?,
        };
        Ok(rank as f64)
    }

    pub fn features(&self) -> &[OrdinalFeature] {
        &self.features
    }

    fn is_sentinel(&self, value: &str) -> bool {
        self.missing_sentinel.as_deref() == Some(value)
    }
}

fn categorical_values<'a>(table: &'a Table, column: &str) -> Result<&'a [Option<String>]> {
    match table.column(column) {
        Some(ColumnData::Categorical(values)) => Ok(values),
        Some(ColumnData::Numeric(_)) => Err(PredictorError::PreprocessingError(format!(
            "column '{}' is numeric, expected categorical",
            column
        ))),
        None => Err(PredictorError::FeatureNotFound(column.to_string())),
    }
}
