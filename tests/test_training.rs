//! Integration test: constraints, cross-validation and grid search

use house_price::inference::TrainedArtifact;
use house_price::preprocessing::{ColumnData, Record, Table};
use house_price::PredictorError;
use house_price::training::{
    KFold, Monotonic, ParamGrid, TrainEngine, TrainingConfig, TrainingReport,
};
use house_price::utils::sample_houses;
use std::collections::HashSet;

fn quick_config() -> TrainingConfig {
    TrainingConfig::default()
        .with_cv_folds(3)
        .with_param_grid(ParamGrid {
            max_depth: vec![None, Some(3)],
            learning_rate: vec![0.1],
            max_iter: vec![20, 40],
        })
}

fn train(rows: usize, seed: u64) -> (TrainedArtifact, TrainingReport) {
    let df = sample_houses(rows, seed).unwrap();
    TrainEngine::new(quick_config()).train_dataframe(&df).unwrap()
}

fn house(area: f64) -> Record {
    Record::new()
        .with("Area", area)
        .with("Bedrooms", 3.0)
        .with("Bathrooms", 2.0)
        .with("Floors", 2.0)
        .with("YearBuilt", 1980.0)
        .with("Location", "Suburban")
        .with("Condition", "Good")
        .with("Garage", "No")
}

#[test]
fn test_constraints_align_with_features() {
    let (artifact, report) = train(150, 1);

    assert_eq!(report.constraint_signs.len(), report.feature_names.len());
    assert_eq!(artifact.model().monotonic_cst().len(), artifact.n_features());

    let constraints = artifact.constraints();
    for field in ["Area", "Bedrooms", "Bathrooms", "Floors", "YearBuilt"] {
        assert_eq!(constraints.get(&format!("num__{field}")), Some(Monotonic::Increasing));
    }
    assert_eq!(constraints.get("cat__Location_Urban"), Some(Monotonic::Unconstrained));
    assert_eq!(constraints.get("Condition__Condition"), Some(Monotonic::Unconstrained));
    assert!(report.constraint_signs.iter().all(|s| *s == 0 || *s == 1));
}

#[test]
fn test_price_never_drops_as_area_grows() {
    let (artifact, _) = train(300, 2);

    let prices: Vec<f64> = (0..=45)
        .map(|i| artifact.predict(&house(500.0 + 100.0 * i as f64)).unwrap())
        .collect();
    for pair in prices.windows(2) {
        assert!(pair[1] >= pair[0], "price fell from {} to {}", pair[0], pair[1]);
    }
    assert!(prices.last().unwrap() > prices.first().unwrap());
}

#[test]
fn test_search_reports_every_candidate() {
    let (artifact, report) = train(150, 3);
    let search = &report.search;

    assert_eq!(search.candidates.len(), 4);
    for candidate in &search.candidates {
        assert_eq!(candidate.fold_metrics.len(), 3);
        assert!(candidate.rmse.mean_score.is_finite());
    }
    let best_rmse = search.best_rmse();
    assert!(search.candidates.iter().all(|c| c.rmse.mean_score >= best_rmse));
    assert_eq!(search.best().rank, 1);
    assert_eq!(artifact.params(), search.best_params());
    assert_eq!(artifact.metadata().cv_rmse, Some(best_rmse));

    let baseline = report.baseline.as_ref().unwrap();
    assert_eq!(baseline.fold_metrics.len(), 3);
}

#[test]
fn test_training_is_reproducible() {
    let (first, first_report) = train(120, 4);
    let (second, second_report) = train(120, 4);

    assert_eq!(first_report.search.best_params(), second_report.search.best_params());
    assert_eq!(first_report.search.best_rmse(), second_report.search.best_rmse());
    let record = house(2100.0);
    assert_eq!(
        first.predict(&record).unwrap().to_bits(),
        second.predict(&record).unwrap().to_bits()
    );
}

#[test]
fn test_parallel_pool_matches_default() {
    let df = sample_houses(120, 6).unwrap();
    let (_, pooled) = TrainEngine::new(quick_config().with_n_jobs(2))
        .train_dataframe(&df)
        .unwrap();
    let (_, default) = TrainEngine::new(quick_config()).train_dataframe(&df).unwrap();
    assert_eq!(pooled.search.best_rmse(), default.search.best_rmse());
}

#[test]
fn test_kfold_partitions_rows() {
    let splits = KFold::new(10).split(95).unwrap();
    assert_eq!(splits.len(), 10);

    let mut seen = HashSet::new();
    for split in &splits {
        assert_eq!(split.train_indices.len() + split.test_indices.len(), 95);
        for i in &split.test_indices {
            assert!(seen.insert(*i), "row {i} tested twice");
        }
    }
    assert_eq!(seen.len(), 95);
}

#[test]
fn test_missing_target_is_an_error() {
    let df = sample_houses(50, 7).unwrap();
    let config = quick_config().with_target("SalePrice");
    assert!(TrainEngine::new(config).train_dataframe(&df).is_err());
}

#[test]
fn test_fold_failure_aborts_training() {
    let df = sample_houses(60, 9).unwrap();
    let mut table = Table::from_dataframe(&df).unwrap();
    let kept_row = 17;
    match table.column_mut("Condition") {
        Some(ColumnData::Categorical(values)) => {
            for (i, v) in values.iter_mut().enumerate() {
                if i != kept_row {
                    *v = None;
                }
            }
        }
        other => panic!("expected categorical Condition, got {:?}", other),
    }

    let config = quick_config().with_baseline_cv(false);
    // The only observed Condition sits in one fold's held-out rows, so that
    // fold trains on an all-missing ordinal column.
    let failing_fold = KFold::new(config.cv_folds)
        .with_shuffle(config.shuffle)
        .with_random_state(config.random_state)
        .split(60)
        .unwrap()
        .into_iter()
        .find(|s| s.test_indices.contains(&kept_row))
        .unwrap()
        .fold_idx;

    match TrainEngine::new(config).train_table(table) {
        Err(PredictorError::TrainingError(msg)) => {
            assert!(msg.starts_with("candidate "), "{msg}");
            assert!(msg.contains(&format!("failed on fold {failing_fold}:")), "{msg}");
            assert!(msg.contains("Condition"), "{msg}");
        }
        other => panic!("expected a training error, got {:?}", other.map(|_| ())),
    }
}
