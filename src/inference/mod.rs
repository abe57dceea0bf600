//! Inference module
//!
//! - [`TrainedArtifact`]: fitted preprocessing plus regressor, persisted as one blob
//! - [`PredictionRequest`]: JSON object to record conversion with field defaults

mod artifact;
mod request;

pub use artifact::{ArtifactMetadata, TrainedArtifact, ARTIFACT_FORMAT_VERSION};
pub use request::{PredictionRequest, MISSING_CATEGORY};
