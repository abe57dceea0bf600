//! House Price Predictor - Main Entry Point

use clap::Parser;
use house_price::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "house_price=info".into()),
        )
        .init();

    run(Cli::parse()).await
}
