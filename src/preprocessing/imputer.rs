//! Missing value imputation strategies

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::table::{ColumnData, Table};

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value
    MostFrequent,
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant string (categorical)
    ConstantString(String),
}

/// Fit-time fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the given columns
    pub fn fit(&mut self, table: &Table, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = table
                .column(col_name)
                .ok_or_else(|| PredictorError::FeatureNotFound(col_name.to_string()))?;

            let fill_value = self.compute_fill_value(col_name, column)?;
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill every fitted column of the table
    pub fn transform(&self, table: &Table) -> Result<Table> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let mut result = table.clone();
        for col_name in self.fill_values.keys() {
            let Some(column) = result.column_mut(col_name) else {
                continue;
            };
            match column {
                ColumnData::Numeric(values) => {
                    for value in values.iter_mut() {
                        *value = Some(self.fill_numeric(col_name, *value)?);
                    }
                }
                ColumnData::Categorical(values) => {
                    for value in values.iter_mut() {
                        if value.is_none() {
                            *value = Some(self.fill_categorical(col_name, None)?.to_string());
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// Fill a numeric cell
    pub fn fill_numeric(&self, column: &str, value: Option<f64>) -> Result<f64> {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            return Ok(v);
        }
        match self.fill_value(column)? {
            ImputeValue::Numeric(v) => Ok(*v),
            ImputeValue::String(s) => Err(PredictorError::PreprocessingError(format!(
                "numeric column '{}' has a text fill value '{}'",
                column, s
            ))),
        }
    }

    /// Fill a categorical cell
    pub fn fill_categorical<'a>(&'a self, column: &str, value: Option<&'a str>) -> Result<&'a str> {
        if let Some(v) = value {
            return Ok(v);
        }
        match self.fill_value(column)? {
            ImputeValue::String(s) => Ok(s.as_str()),
            ImputeValue::Numeric(v) => Err(PredictorError::PreprocessingError(format!(
                "categorical column '{}' has a numeric fill value {}",
                column, v
            ))),
        }
    }

    /// The fitted fill value for a column
    pub fn fill_value(&self, column: &str) -> Result<&ImputeValue> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        self.fill_values
            .get(column)
            .ok_or_else(|| PredictorError::FeatureNotFound(column.to_string()))
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    fn compute_fill_value(&self, name: &str, column: &ColumnData) -> Result<ImputeValue> {
        match (column, &self.strategy) {
            (ColumnData::Numeric(_), ImputeStrategy::Constant(v)) => Ok(ImputeValue::Numeric(*v)),
            (ColumnData::Categorical(_), ImputeStrategy::ConstantString(s)) => {
                Ok(ImputeValue::String(s.clone()))
            }
            (ColumnData::Numeric(values), strategy) => {
                let observed: Vec<f64> = values
                    .iter()
                    .filter_map(|v| *v)
                    .filter(|v| v.is_finite())
                    .collect();
                if observed.is_empty() {
                    return Err(PredictorError::PreprocessingError(format!(
                        "column '{}' has no observed values to impute from",
                        name
                    )));
                }
                let fill = match strategy {
                    ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                    ImputeStrategy::Median => median(observed),
                    ImputeStrategy::MostFrequent => mode_numeric(&observed),
                    other => {
                        return Err(PredictorError::InvalidParameter {
                            name: "impute_strategy".to_string(),
                            value: format!("{:?}", other),
                            reason: format!("not applicable to numeric column '{}'", name),
                        })
                    }
                };
                Ok(ImputeValue::Numeric(fill))
            }
            (ColumnData::Categorical(values), ImputeStrategy::MostFrequent) => {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.iter().flatten() {
                    *counts.entry(v.as_str()).or_insert(0) += 1;
                }
                // BTreeMap order makes the smallest label win ties
                let mode = counts
                    .iter()
                    .fold(None::<(&str, usize)>, |best, (&label, &count)| match best {
                        Some((_, best_count)) if best_count >= count => best,
                        _ => Some((label, count)),
                    })
                    .map(|(label, _)| label.to_string())
                    .ok_or_else(|| {
                        PredictorError::PreprocessingError(format!(
                            "column '{}' has no observed values to impute from",
                            name
                        ))
                    })?;
                Ok(ImputeValue::String(mode))
            }
            (ColumnData::Categorical(_), other) => Err(PredictorError::InvalidParameter {
                name: "impute_strategy".to_string(),
                value: format!("{:?}", other),
                reason: format!("not applicable to categorical column '{}'", name),
            }),
        }
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn mode_numeric(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> Table {
        let mut table = Table::new();
        table
            .push_column("a", ColumnData::Numeric(vec![Some(1.0), None, Some(3.0), Some(10.0)]))
            .unwrap();
        table
            .push_column(
                "b",
                ColumnData::Categorical(vec![
                    Some("x".into()),
                    Some("y".into()),
                    None,
                    Some("y".into()),
                ]),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_median_imputation() {
        let table = create_test_table();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&table, &["a"]).unwrap();

        assert_eq!(imputer.fill_numeric("a", None).unwrap(), 3.0);
        assert_eq!(imputer.fill_numeric("a", Some(7.5)).unwrap(), 7.5);
        assert_eq!(imputer.fill_numeric("a", Some(f64::NAN)).unwrap(), 3.0);
    }

    #[test]
    fn test_mean_imputation() {
        let table = create_test_table();
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&table, &["a"]).unwrap();
        assert!((imputer.fill_numeric("a", None).unwrap() - 14.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_most_frequent_categorical() {
        let table = create_test_table();
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&table, &["b"]).unwrap();

        assert_eq!(imputer.fill_categorical("b", None).unwrap(), "y");
        assert_eq!(imputer.fill_categorical("b", Some("x")).unwrap(), "x");
    }

    #[test]
    fn test_most_frequent_tie_takes_smallest_label() {
        let mut table = Table::new();
        table
            .push_column(
                "c",
                ColumnData::Categorical(vec![Some("zeta".into()), Some("alpha".into())]),
            )
            .unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&table, &["c"]).unwrap();
        assert_eq!(imputer.fill_categorical("c", None).unwrap(), "alpha");
    }

    #[test]
    fn test_all_missing_column_fails() {
        let mut table = Table::new();
        table.push_column("a", ColumnData::Numeric(vec![None, None])).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.fit(&table, &["a"]),
            Err(PredictorError::PreprocessingError(_))
        ));
    }

    #[test]
    fn test_unfitted_imputer() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.fill_numeric("a", None),
            Err(PredictorError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_numeric_mode() {
        assert_eq!(mode_numeric(&[3.0, 1.0, 3.0, 2.0]), 3.0);
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}
