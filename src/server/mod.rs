//! HTTP serving for a trained house price artifact
//!
//! The artifact is loaded once before the listener binds and shared
//! read-only with every handler through an [`AppState`].

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: PathBuf::from("house_model.bin"),
        }
    }
}

impl ServerConfig {
    /// Read `API_HOST`, `PORT` and `MODEL_PATH`, falling back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

/// Load the artifact, then serve until ctrl+c
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = Instant::now();
    info!(model_path = %config.model_path.display(), "Loading trained artifact");

    let state = Arc::new(AppState::load(config.clone())?);
    info!(
        features = state.artifact().n_features(),
        trained_on = state.artifact().metadata().n_training_samples,
        params = %state.artifact().params(),
        "Artifact loaded"
    );

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        info!(
            uptime_secs = start_time.elapsed().as_secs(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_path, PathBuf::from("house_model.bin"));
    }

    #[test]
    fn test_builders_override() {
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(8081)
            .with_model_path("/tmp/model.bin");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.model_path, PathBuf::from("/tmp/model.bin"));
    }

    #[tokio::test]
    async fn test_missing_artifact_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(0)
            .with_model_path(dir.path().join("absent.bin"));
        assert!(run_server(config).await.is_err());
    }
}
