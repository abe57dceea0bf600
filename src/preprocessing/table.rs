//! Column-oriented training table and single-record input

use crate::error::{PredictorError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ColumnType;

/// Values of one column; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Categorical(_) => ColumnType::Categorical,
        }
    }

    fn select(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// An ordered set of named, equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<ColumnData>,
    n_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if self.names.iter().any(|n| *n == name) {
            return Err(PredictorError::DataError(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && data.len() != self.n_rows {
            return Err(PredictorError::ShapeError {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows in column '{}'", data.len(), name),
            });
        }
        self.n_rows = data.len();
        self.names.push(name);
        self.columns.push(data);
        Ok(())
    }

    /// Convert a polars frame. Integer and float columns become numeric,
    /// everything else is read as text.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut table = Table::new();
        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();
            let data = match series.dtype() {
                DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
                DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
                DataType::Float32 | DataType::Float64 => {
                    let casted = series.cast(&DataType::Float64)?;
                    let values: Vec<Option<f64>> = casted.f64()?.into_iter().collect();
                    ColumnData::Numeric(values)
                }
                _ => {
                    let casted = series.cast(&DataType::String)?;
                    let values: Vec<Option<String>> = casted
                        .str()?
                        .into_iter()
                        .map(|v| v.map(|s| s.to_string()))
                        .collect();
                    ColumnData::Categorical(values)
                }
            };
            table.push_column(name, data)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnData> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(&mut self.columns[idx])
    }

    /// Iterate `(name, data)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnData)> {
        self.names.iter().map(|n| n.as_str()).zip(self.columns.iter())
    }

    /// Remove a column and return its data
    pub fn take_column(&mut self, name: &str) -> Option<ColumnData> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.names.remove(idx);
        let data = self.columns.remove(idx);
        if self.columns.is_empty() {
            self.n_rows = 0;
        }
        Some(data)
    }

    /// Drop every listed column that is present; absent names are ignored.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut dropped = Vec::new();
        for name in names {
            if self.take_column(name.as_ref()).is_some() {
                dropped.push(name.as_ref().to_string());
            }
        }
        dropped
    }

    /// Remove the numeric target column and return it with missing rows rejected.
    pub fn split_target(&mut self, target: &str) -> Result<Vec<f64>> {
        match self.take_column(target) {
            Some(ColumnData::Numeric(values)) => values
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        PredictorError::DataError(format!("target '{}' is missing at row {}", target, row))
                    })
                })
                .collect(),
            Some(ColumnData::Categorical(_)) => Err(PredictorError::DataError(format!(
                "target '{}' must be numeric",
                target
            ))),
            None => Err(PredictorError::FeatureNotFound(target.to_string())),
        }
    }

    /// New table holding the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Read one row as a record
    pub fn record(&self, row: usize) -> Option<Record> {
        if row >= self.n_rows {
            return None;
        }
        let mut record = Record::new();
        for (name, data) in self.iter() {
            let value = match data {
                ColumnData::Numeric(v) => v[row].map(FieldValue::Number).unwrap_or(FieldValue::Missing),
                ColumnData::Categorical(v) => v[row]
                    .clone()
                    .map(FieldValue::Text)
                    .unwrap_or(FieldValue::Missing),
            };
            record.insert(name, value);
        }
        Some(record)
    }
}

/// A single raw field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Numeric reading; text is parsed, unparseable text is missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            FieldValue::Missing => None,
        }
    }

    /// Categorical reading; numbers are formatted as text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(v) => Some(v.to_string()),
            FieldValue::Missing => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// One house observation keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "Id" => &[1i64, 2, 3],
            "Area" => &[Some(1200.0), None, Some(900.0)],
            "Location" => &["Urban", "Rural", "Urban"],
            "Price" => &[250000.0, 180000.0, 210000.0]
        )
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_types() {
        let table = Table::from_dataframe(&create_test_dataframe()).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column("Id").unwrap().column_type(), ColumnType::Numeric);
        assert_eq!(table.column("Location").unwrap().column_type(), ColumnType::Categorical);
        assert_eq!(
            table.column("Area"),
            Some(&ColumnData::Numeric(vec![Some(1200.0), None, Some(900.0)]))
        );
    }

    #[test]
    fn test_split_target_and_drop() {
        let mut table = Table::from_dataframe(&create_test_dataframe()).unwrap();
        let y = table.split_target("Price").unwrap();
        assert_eq!(y, vec![250000.0, 180000.0, 210000.0]);

        let dropped = table.drop_columns(&["Id", "NotThere"]);
        assert_eq!(dropped, vec!["Id".to_string()]);
        assert_eq!(table.column_names(), &["Area".to_string(), "Location".to_string()]);
    }

    #[test]
    fn test_missing_target_is_error() {
        let mut table = Table::from_dataframe(&create_test_dataframe()).unwrap();
        assert!(matches!(
            table.split_target("SalePrice"),
            Err(PredictorError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = Table::new();
        table.push_column("a", ColumnData::Numeric(vec![Some(1.0), Some(2.0)])).unwrap();
        let err = table.push_column("b", ColumnData::Numeric(vec![Some(1.0)]));
        assert!(matches!(err, Err(PredictorError::ShapeError { .. })));
    }

    #[test]
    fn test_select_rows_and_record() {
        let table = Table::from_dataframe(&create_test_dataframe()).unwrap();
        let subset = table.select_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);

        let record = subset.record(0).unwrap();
        assert_eq!(record.get("Area"), Some(&FieldValue::Number(900.0)));
        assert_eq!(record.get("Location"), Some(&FieldValue::Text("Urban".to_string())));
        assert!(subset.record(2).is_none());
    }

    #[test]
    fn test_field_value_readings() {
        assert_eq!(FieldValue::from("1200").as_number(), Some(1200.0));
        assert_eq!(FieldValue::from("large").as_number(), None);
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
        assert_eq!(FieldValue::Number(3.0).as_text(), Some("3".to_string()));
        assert_eq!(FieldValue::Missing.as_text(), None);
    }
}
