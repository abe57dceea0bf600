//! Feature scaling implementations

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::table::{ColumnData, Table};

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Feature scaler over imputed numeric columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data. Columns must already be imputed.
    pub fn fit(&mut self, table: &Table, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let values = match table.column(col_name) {
                Some(ColumnData::Numeric(values)) => values
                    .iter()
                    .map(|v| {
                        v.ok_or_else(|| {
                            PredictorError::PreprocessingError(format!(
                                "column '{}' must be imputed before scaling",
                                col_name
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?,
                Some(ColumnData::Categorical(_)) => {
                    return Err(PredictorError::PreprocessingError(format!(
                        "cannot scale categorical column '{}'",
                        col_name
                    )))
                }
                None => return Err(PredictorError::FeatureNotFound(col_name.to_string())),
            };

            let params = self.compute_params(&values);
            self.params.insert(col_name.to_string(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale one value of a fitted column
    pub fn scale(&self, column: &str, value: f64) -> Result<f64> {
        let params = self.params(column)?;
        Ok((value - params.center) / params.scale)
    }

    pub fn params(&self, column: &str) -> Result<&ScalerParams> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }
        self.params
            .get(column)
            .ok_or_else(|| PredictorError::FeatureNotFound(column.to_string()))
    }

    fn compute_params(&self, values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }

        match self.scaler_type {
            ScalerType::Standard => {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                // Population variance
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            }
            ScalerType::None => ScalerParams { center: 0.0, scale: 1.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_table(values: &[f64]) -> Table {
        let mut table = Table::new();
        table
            .push_column("a", ColumnData::Numeric(values.iter().map(|v| Some(*v)).collect()))
            .unwrap();
        table
    }

    #[test]
    fn test_standard_scaler() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&numeric_table(&values), &["a"]).unwrap();

        let scaled: Vec<f64> = values.iter().map(|v| scaler.scale("a", *v).unwrap()).collect();
        let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
        let var = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / scaled.len() as f64;
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_is_centered_only() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&numeric_table(&[7.0, 7.0, 7.0]), &["a"]).unwrap();
        assert_eq!(scaler.scale("a", 7.0).unwrap(), 0.0);
        assert_eq!(scaler.scale("a", 9.0).unwrap(), 2.0);
    }

    #[test]
    fn test_minmax_scaler() {
        let mut scaler = Scaler::new(ScalerType::MinMax);
        scaler.fit(&numeric_table(&[1.0, 3.0, 5.0]), &["a"]).unwrap();
        assert!((scaler.scale("a", 1.0).unwrap()).abs() < 1e-10);
        assert!((scaler.scale("a", 5.0).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_unimputed_column_rejected() {
        let mut table = Table::new();
        table.push_column("a", ColumnData::Numeric(vec![Some(1.0), None])).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        assert!(scaler.fit(&table, &["a"]).is_err());
    }
}
