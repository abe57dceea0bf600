//! Application state shared across handlers

use crate::error::Result;
use crate::inference::TrainedArtifact;

use super::ServerConfig;

/// Immutable serving state, built once at startup
pub struct AppState {
    pub config: ServerConfig,
    artifact: TrainedArtifact,
}

impl AppState {
    pub fn new(config: ServerConfig, artifact: TrainedArtifact) -> Self {
        Self { config, artifact }
    }

    /// Load the artifact named by `config.model_path`
    pub fn load(config: ServerConfig) -> Result<Self> {
        let artifact = TrainedArtifact::load(&config.model_path)?;
        Ok(Self::new(config, artifact))
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }
}
