//! Persisted model artifact

use crate::error::{PredictorError, Result};
use crate::preprocessing::{DataPreprocessor, Record, Table};
use crate::training::{
    FittedPipeline, HistGradientBoostingRegressor, HyperParams, MonotonicConstraints,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use super::request::PredictionRequest;

/// Bumped whenever the serialized layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Provenance of a trained artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub crate_version: String,
    pub target_column: String,
    pub n_training_samples: usize,
    /// Mean cross-validated RMSE of the selected parameters
    pub cv_rmse: Option<f64>,
    pub created_unix_secs: u64,
}

impl ArtifactMetadata {
    pub fn new(target_column: impl Into<String>, n_training_samples: usize) -> Self {
        let created_unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            target_column: target_column.into(),
            n_training_samples,
            cv_rmse: None,
            created_unix_secs,
        }
    }

    pub fn with_cv_rmse(mut self, rmse: f64) -> Self {
        self.cv_rmse = Some(rmse);
        self
    }
}

/// Fitted preprocessing and regressor saved as one unit.
///
/// Prediction never refits anything and only takes `&self`, so one artifact
/// can serve any number of threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    preprocessor: DataPreprocessor,
    constraints: MonotonicConstraints,
    model: HistGradientBoostingRegressor,
    params: HyperParams,
    metadata: ArtifactMetadata,
}

impl TrainedArtifact {
    pub fn new(fitted: FittedPipeline, params: HyperParams, metadata: ArtifactMetadata) -> Result<Self> {
        let FittedPipeline { preprocessor, constraints, model } = fitted;
        let artifact = Self {
            preprocessor,
            constraints,
            model,
            params,
            metadata,
        };
        artifact.check_consistency()?;
        Ok(artifact)
    }

    /// Predict the price of one house
    pub fn predict(&self, record: &Record) -> Result<f64> {
        let row = self.preprocessor.transform_record(record)?;
        self.model.predict_one(&row)
    }

    /// Predict every row of a table
    pub fn predict_table(&self, table: &Table) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(table)?;
        self.model.predict(&x)
    }

    /// Predict from a JSON object of field values, filling absent fields
    pub fn predict_json(&self, payload: &serde_json::Value) -> Result<f64> {
        let record = PredictionRequest::new(self.numeric_fields(), &self.categorical_fields())
            .into_record(payload)?;
        self.predict(&record)
    }

    /// Write the artifact as a single bincode file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)?;
        info!(path = %path.display(), features = self.n_features(), "Artifact saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = bincode::deserialize(bytes)?;
        if artifact.metadata.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PredictorError::SerializationError(format!(
                "artifact format version {} is not supported (expected {})",
                artifact.metadata.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        artifact.check_consistency()?;
        Ok(artifact)
    }

    pub fn numeric_fields(&self) -> &[String] {
        self.preprocessor.numeric_fields()
    }

    pub fn categorical_fields(&self) -> Vec<String> {
        self.preprocessor.categorical_fields()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    pub fn n_features(&self) -> usize {
        self.preprocessor.n_features()
    }

    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    pub fn constraints(&self) -> &MonotonicConstraints {
        &self.constraints
    }

    pub fn model(&self) -> &HistGradientBoostingRegressor {
        &self.model
    }

    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    fn check_consistency(&self) -> Result<()> {
        if !self.preprocessor.is_fitted() || !self.model.is_fitted() {
            return Err(PredictorError::ModelNotFitted);
        }
        let positional = self.constraints.to_positional(&self.preprocessor.feature_names())?;
        if positional.as_slice() != self.model.monotonic_cst() {
            return Err(PredictorError::ValidationError(
                "regressor constraints differ from the feature binding".to_string(),
            ));
        }
        Ok(())
    }
}
