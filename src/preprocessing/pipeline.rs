//! Data preprocessing pipeline

use crate::error::{PredictorError, Result};
use super::{
    classifier::{FeatureClassifier, FeatureGroup, FeatureGroups},
    config::PreprocessingConfig,
    encoder::{OneHotEncoder, OrdinalEncoder},
    imputer::Imputer,
    scaler::Scaler,
    table::{ColumnData, Record, Table},
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Instant;
use tracing::debug;

/// One output column of the transform and the field it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub source: String,
    pub group: FeatureGroup,
}

/// Column transform: numeric impute + scale, nominal impute + one-hot,
/// ordinal rank encoding. Output columns are numeric first, then nominal
/// blocks, then ordinal features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    groups: FeatureGroups,
    numeric_imputer: Option<Imputer>,
    categorical_imputer: Option<Imputer>,
    scaler: Option<Scaler>,
    one_hot: Option<OneHotEncoder>,
    ordinal: Option<OrdinalEncoder>,
    feature_specs: Vec<FeatureSpec>,
    is_fitted: bool,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl DataPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            groups: FeatureGroups::default(),
            numeric_imputer: None,
            categorical_imputer: None,
            scaler: None,
            one_hot: None,
            ordinal: None,
            feature_specs: Vec::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    /// Fit on the training features (target and dropped columns removed)
    pub fn fit(&mut self, table: &Table) -> Result<&mut Self> {
        let start = Instant::now();

        if table.is_empty() || table.n_columns() == 0 {
            return Err(PredictorError::DataError(
                "cannot fit preprocessor on an empty table".to_string(),
            ));
        }

        let table = self.remapped(table);
        let groups = FeatureClassifier::new(self.config.ordinal_features.clone()).classify(&table);

        let numeric: Vec<&str> = groups.numeric.iter().map(String::as_str).collect();
        let nominal: Vec<&str> = groups.nominal.iter().map(String::as_str).collect();

        self.numeric_imputer = None;
        self.scaler = None;
        if !numeric.is_empty() {
            let mut imputer = Imputer::new(self.config.numeric_impute_strategy.clone());
            imputer.fit(&table, &numeric)?;
            let imputed = imputer.transform(&table)?;

            let mut scaler = Scaler::new(self.config.scaler_type.clone());
            scaler.fit(&imputed, &numeric)?;

            self.numeric_imputer = Some(imputer);
            self.scaler = Some(scaler);
        }

        self.categorical_imputer = None;
        self.one_hot = None;
        if !nominal.is_empty() {
            let mut imputer = Imputer::new(self.config.categorical_impute_strategy.clone());
            imputer.fit(&table, &nominal)?;
            let imputed = imputer.transform(&table)?;

            let mut encoder = OneHotEncoder::new(self.config.handle_unknown);
            encoder.fit(&imputed, &nominal)?;

            self.categorical_imputer = Some(imputer);
            self.one_hot = Some(encoder);
        }

        self.ordinal = None;
        if !groups.ordinal.is_empty() {
            let mut encoder =
                OrdinalEncoder::new(groups.ordinal.clone(), self.config.missing_sentinel.clone());
            encoder.fit(&table)?;
            self.ordinal = Some(encoder);
        }

        self.groups = groups;
        self.feature_specs = self.build_feature_specs()?;
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());

        debug!(
            rows = table.n_rows(),
            features = self.feature_specs.len(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform a table into the feature matrix
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let table = self.remapped(table);
        let n_rows = table.n_rows();
        let mut out = Array2::<f64>::zeros((n_rows, self.feature_specs.len()));
        let mut offset = 0;

        for field in &self.groups.numeric {
            let values = match table.column(field) {
                Some(ColumnData::Numeric(values)) => values,
                Some(ColumnData::Categorical(_)) => {
                    return Err(PredictorError::PreprocessingError(format!(
                        "column '{}' was numeric at fit time",
                        field
                    )))
                }
                None => return Err(PredictorError::FeatureNotFound(field.clone())),
            };
            for (row, value) in values.iter().enumerate() {
                out[[row, offset]] = self.numeric_value(field, *value)?;
            }
            offset += 1;
        }

        let mut block = Vec::new();
        for field in &self.groups.nominal {
            let values = text_column(&table, field)?;
            for (row, value) in values.iter().enumerate() {
                block.clear();
                self.nominal_into(field, value.as_deref(), &mut block)?;
                for (j, v) in block.iter().enumerate() {
                    out[[row, offset + j]] = *v;
                }
            }
            offset += self.nominal_width(field)?;
        }

        for feature in &self.groups.ordinal {
            let values = text_column(&table, &feature.name)?;
            for (row, value) in values.iter().enumerate() {
                out[[row, offset]] = self.ordinal_value(&feature.name, value.as_deref())?;
            }
            offset += 1;
        }

        if offset != self.feature_specs.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("{} features", self.feature_specs.len()),
                actual: format!("{} features", offset),
            });
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Transform a single record.
    ///
    /// An absent numeric field reads as 0.0. An absent categorical field reads
    /// as the missing sentinel when one is configured, otherwise as missing.
    pub fn transform_record(&self, record: &Record) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(PredictorError::ModelNotFitted);
        }

        let mut record = record.clone();
        for remap in &self.config.label_remaps {
            remap.apply_record(&mut record);
        }

        let mut row = Vec::with_capacity(self.feature_specs.len());

        for field in &self.groups.numeric {
            let value = match record.get(field) {
                None => Some(0.0),
                Some(v) => v.as_number(),
            };
            row.push(self.numeric_value(field, value)?);
        }

        for field in &self.groups.nominal {
            let value = self.record_text(&record, field);
            self.nominal_into(field, value.as_deref(), &mut row)?;
        }

        for feature in &self.groups.ordinal {
            let value = self.record_text(&record, &feature.name);
            row.push(self.ordinal_value(&feature.name, value.as_deref())?);
        }

        Ok(Array1::from(row))
    }

    /// Output features in column order
    pub fn feature_specs(&self) -> &[FeatureSpec] {
        &self.feature_specs
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.feature_specs.iter().map(|f| f.name.clone()).collect()
    }

    pub fn n_features(&self) -> usize {
        self.feature_specs.len()
    }

    pub fn groups(&self) -> &FeatureGroups {
        &self.groups
    }

    /// Raw fields read as numbers
    pub fn numeric_fields(&self) -> &[String] {
        &self.groups.numeric
    }

    /// Raw fields read as text, nominal first then ordinal
    pub fn categorical_fields(&self) -> Vec<String> {
        self.groups.categorical()
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    fn remapped<'a>(&self, table: &'a Table) -> Cow<'a, Table> {
        let relevant = self
            .config
            .label_remaps
            .iter()
            .any(|r| matches!(table.column(&r.field), Some(ColumnData::Categorical(_))));
        if !relevant {
            return Cow::Borrowed(table);
        }

        let mut owned = table.clone();
        for remap in &self.config.label_remaps {
            let rewritten = remap.apply_table(&mut owned);
            if rewritten > 0 {
                debug!(field = %remap.field, rewritten, "Applied legacy label remap");
            }
        }
        Cow::Owned(owned)
    }

    fn record_text(&self, record: &Record, field: &str) -> Option<String> {
        match record.get(field) {
            Some(value) => value.as_text(),
            None => self.config.missing_sentinel.clone(),
        }
    }

    fn numeric_value(&self, field: &str, value: Option<f64>) -> Result<f64> {
        let imputer = self.numeric_imputer.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        let scaler = self.scaler.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        scaler.scale(field, imputer.fill_numeric(field, value)?)
    }

    fn nominal_into(&self, field: &str, value: Option<&str>, out: &mut Vec<f64>) -> Result<()> {
        let imputer = self
            .categorical_imputer
            .as_ref()
            .ok_or(PredictorError::ModelNotFitted)?;
        let encoder = self.one_hot.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        encoder.encode_into(field, imputer.fill_categorical(field, value)?, out)
    }

    fn nominal_width(&self, field: &str) -> Result<usize> {
        self.one_hot
            .as_ref()
            .ok_or(PredictorError::ModelNotFitted)?
            .width(field)
    }

    fn ordinal_value(&self, field: &str, value: Option<&str>) -> Result<f64> {
        self.ordinal
            .as_ref()
            .ok_or(PredictorError::ModelNotFitted)?
            .encode(field, value)
    }

    fn build_feature_specs(&self) -> Result<Vec<FeatureSpec>> {
        let mut specs = Vec::new();

        for field in &self.groups.numeric {
            specs.push(FeatureSpec {
                name: format!("{}__{}", FeatureGroup::Numeric.prefix(), field),
                source: field.clone(),
                group: FeatureGroup::Numeric,
            });
        }

        if let Some(encoder) = &self.one_hot {
            for field in &self.groups.nominal {
                for category in encoder.categories(field)? {
                    specs.push(FeatureSpec {
                        name: format!("{}__{}_{}", FeatureGroup::Nominal.prefix(), field, category),
                        source: field.clone(),
                        group: FeatureGroup::Nominal,
                    });
                }
            }
        }

        for feature in &self.groups.ordinal {
            specs.push(FeatureSpec {
                name: format!("{}__{}", feature.name, feature.name),
                source: feature.name.clone(),
                group: FeatureGroup::Ordinal,
            });
        }

        Ok(specs)
    }
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn text_column<'a>(table: &'a Table, field: &str) -> Result<&'a [Option<String>]> {
    match table.column(field) {
        Some(ColumnData::Categorical(values)) => Ok(values),
        Some(ColumnData::Numeric(_)) => Err(PredictorError::PreprocessingError(format!(
            "column '{}' was categorical at fit time",
            field
        ))),
        None => Err(PredictorError::FeatureNotFound(field.to_string())),
    }
}
