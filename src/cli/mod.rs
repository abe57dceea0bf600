//! House price CLI
//!
//! Command-line interface for training, one-off prediction, schema
//! inspection and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::inference::TrainedArtifact;
use crate::preprocessing::FeatureClassifier;
use crate::server::{run_server, ServerConfig};
use crate::training::{CandidateResult, TrainEngine, TrainingConfig, TrainingReport};
use crate::utils::{format_duration, Timer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "house-price")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve a monotonic house price model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on a CSV of listings and save the artifact
    Train {
        /// Training data (CSV with header)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: Option<String>,

        /// Columns to drop before training (repeatable)
        #[arg(long)]
        drop: Vec<String>,

        /// Number of cross-validation folds
        #[arg(long)]
        folds: Option<usize>,

        /// Training configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output artifact file
        #[arg(short, long, default_value = "house_model.bin")]
        output: PathBuf,
    },

    /// Predict the price of one house
    Predict {
        /// Trained artifact file
        #[arg(short, long, default_value = "house_model.bin")]
        model: PathBuf,

        /// JSON object of field values, or @path to a JSON file
        #[arg(short, long)]
        input: String,
    },

    /// Show the detected feature groups of a dataset
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Training configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Start the prediction server
    Serve {
        /// Trained artifact file (overrides MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Server host (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train { data, target, drop, folds, config, output } => {
            let config = build_training_config(config.as_deref(), target, drop, folds)?;
            cmd_train(&data, config, &output)
        }
        Commands::Predict { model, input } => cmd_predict(&model, &input),
        Commands::Info { data, config } => {
            let config = build_training_config(config.as_deref(), None, Vec::new(), None)?;
            cmd_info(&data, &config)
        }
        Commands::Serve { model, host, port } => cmd_serve(model, host, port).await,
    }
}

/// Layer command-line overrides on top of an optional JSON config
pub fn build_training_config(
    path: Option<&Path>,
    target: Option<String>,
    drop: Vec<String>,
    folds: Option<usize>,
) -> anyhow::Result<TrainingConfig> {
    let mut config = match path {
        Some(path) => TrainingConfig::load(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(target) = target {
        config = config.with_target(target);
    }
    if !drop.is_empty() {
        config = config.with_drop_columns(drop);
    }
    if let Some(folds) = folds {
        config = config.with_cv_folds(folds);
    }
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(data_path: &Path, config: TrainingConfig, output: &Path) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let timer = Timer::start();
    let table = config.data_loader().load_table(data_path)?;
    step_done(&format!("{} rows × {} cols in {}", table.n_rows(), table.n_columns(), format_duration(timer.elapsed())));

    step_run(&format!(
        "Searching {} candidates × {} folds",
        config.param_grid.len(),
        config.cv_folds
    ));
    let (artifact, report) = TrainEngine::new(config).train_table(table)?;
    step_done(&format!("{:.2}s", report.training_time_secs));

    print_features(&report);
    if let Some(ref baseline) = report.baseline {
        print_baseline(baseline);
    }
    print_search(&report);

    step_run(&format!("Saving → {}", output.display()));
    artifact.save(output)?;
    step_done(&format!("{} features", artifact.n_features()));
    println!();
    Ok(())
}

fn print_features(report: &TrainingReport) {
    section("Features");
    for (name, sign) in report.feature_names.iter().zip(&report.constraint_signs) {
        let marker = if *sign > 0 { ok("+1") } else { dim(" 0") };
        println!("  {}  {}", marker, name);
    }
}

fn print_baseline(baseline: &CandidateResult) {
    section("Baseline cross-validation");
    println!("  {:<6} {:>14} {:>14} {:>8}", muted("Fold"), muted("RMSE"), muted("MAE"), muted("R²"));
    for (fold, m) in baseline.fold_metrics.iter().enumerate() {
        println!("  {:<6} {:>14.2} {:>14.2} {:>8.4}", fold + 1, m.rmse, m.mae, m.r2);
    }
    println!("  {}", dim(&"─".repeat(46)));
    println!(
        "  {:<6} {:>14.2} {:>14.2} {:>8.4}",
        "mean".white().bold(),
        baseline.rmse.mean_score,
        baseline.mean_mae,
        baseline.mean_r2
    );
}

fn print_search(report: &TrainingReport) {
    section("Grid search");
    let best = report.search.best();
    kv("Best params", &best.params.to_string());
    kv("Best CV RMSE", &format!("{:.2} ± {:.2}", best.rmse.mean_score, best.rmse.std_score));
    kv("Candidates", &report.search.candidates.len().to_string());
    println!();
}

pub fn cmd_predict(model_path: &Path, input: &str) -> anyhow::Result<()> {
    let artifact = TrainedArtifact::load(model_path)?;
    let raw = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => input.to_string(),
    };
    let payload: serde_json::Value = serde_json::from_str(&raw)?;
    let price = artifact.predict_json(&payload)?;
    println!("{:.2}", price);
    Ok(())
}

pub fn cmd_info(data_path: &Path, config: &TrainingConfig) -> anyhow::Result<()> {
    section("Dataset");

    let mut table = config.data_loader().load_table(data_path)?;
    kv("Rows", &table.n_rows().to_string());
    kv("Columns", &table.n_columns().to_string());

    let dropped = table.drop_columns(&config.drop_columns);
    if table.take_column(&config.target_column).is_some() {
        kv("Target", &config.target_column);
    }
    if !dropped.is_empty() {
        kv("Dropped", &dropped.join(", "));
    }

    let groups = FeatureClassifier::new(config.preprocessing.ordinal_features.clone()).classify(&table);
    section("Feature groups");
    kv("Numeric", &groups.numeric.join(", "));
    kv("Nominal", &groups.nominal.join(", "));
    for feature in &groups.ordinal {
        kv(&format!("Ordinal {}", feature.name), &feature.categories.join(" < "));
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(model: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(model) = model {
        config = config.with_model_path(model);
    }
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    run_server(config).await
}
