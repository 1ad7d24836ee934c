//! Integration tests for training, persistence and querying.
//!
//! The fixtures are small CSV exports of the flood table; every test trains a
//! reduced forest so the suite stays fast.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::PathBuf;
use waterlog_learning::{
    ArtifactLayout, ForestConfig, LearningError, Pipeline, PipelineConfig, TrainedModel,
    TrainingResult, write_report,
};
use waterlog_processing::{DatasetSchema, load_dataset};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixture(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(filename)
}

fn load(filename: &str) -> DataFrame {
    load_dataset(fixture(filename), "Sheet1", &DatasetSchema::default())
        .expect("Failed to load fixture")
}

fn config(seed: u64) -> PipelineConfig {
    PipelineConfig::builder()
        .forest(ForestConfig::builder().n_estimators(25).build().unwrap())
        .random_seed(seed)
        .build()
        .unwrap()
}

fn train(filename: &str, seed: u64) -> (TrainingResult, TrainedModel) {
    Pipeline::builder()
        .config(config(seed))
        .build()
        .unwrap()
        .train(&load(filename))
        .expect("Training should succeed")
}

fn demo_query() -> Value {
    json!({
        "Water_Table": "High",
        "urbanization": "Good",
        "Elevation": 5,
        "precipitation": 30,
        "runoff_coefficient": 0.6,
        "drainage": 25
    })
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_end_to_end_small_table() {
    let (result, model) = train("flood_small.csv", 42);

    assert_eq!(result.train_size, 8);
    assert_eq!(result.test_size, 2);

    let actual: Vec<Option<i64>> = result
        .test_probabilities
        .column("Actual")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(actual.len(), 2);

    let total: f64 = result.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-6, "importances sum to {}", total);

    let ranked: Vec<f64> = result.feature_importance.iter().map(|f| f.importance).collect();
    assert!(ranked.windows(2).all(|w| w[0] >= w[1]));

    let x = model.preprocessor().transform(&load("flood_small.csv")).unwrap();
    assert_eq!(x.width(), 6);
    for row in 0..x.height() {
        let values: Vec<f64> = x
            .get_columns()
            .iter()
            .map(|c| {
                c.as_materialized_series()
                    .cast(&DataType::Float64)
                    .unwrap()
                    .f64()
                    .unwrap()
                    .get(row)
                    .unwrap()
            })
            .collect();
        let prediction = model.predict_row(&values).unwrap();
        assert!(prediction.label <= 1);
    }
}

#[test]
fn test_sentinels_are_imputed_before_training() {
    let (result, _) = train("flood_sentinel.csv", 42);

    assert_eq!(result.imputation.replaced, 3);
    assert_eq!(result.imputation.group_means["North"], 21.0);
    assert_eq!(result.imputation.group_means["South"], 24.0);
    assert_eq!(result.train_size + result.test_size, 8);
}

#[test]
fn test_training_is_reproducible() {
    let (first_result, first_model) = train("flood_small.csv", 7);
    let (second_result, second_model) = train("flood_small.csv", 7);

    assert_eq!(first_model, second_model);
    assert_eq!(
        first_result.feature_importance,
        second_result.feature_importance
    );
    assert!(
        first_result
            .test_probabilities
            .equals(&second_result.test_probabilities)
    );
}

// ============================================================================
// Querying
// ============================================================================

#[test]
fn test_demo_query() {
    let (_, model) = train("flood_small.csv", 42);

    let prediction = model.predict(&demo_query()).unwrap();

    assert!(prediction.label <= 1);
    assert_eq!(prediction.probabilities.len(), 2);
    let total: f64 = prediction.probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(prediction.confidence, prediction.probabilities[prediction.label]);
}

#[test]
fn test_unknown_category_is_rejected() {
    let (_, model) = train("flood_small.csv", 42);
    let mut query = demo_query();
    query["Water_Table"] = json!("Medium");

    let err = model.predict(&query).unwrap_err();

    assert!(err.is_unknown_category());
    assert_eq!(err.error_code(), "UNKNOWN_CATEGORY");
}

#[test]
fn test_missing_query_field_is_schema_mismatch() {
    let (_, model) = train("flood_small.csv", 42);
    let mut query = demo_query();
    query.as_object_mut().unwrap().remove("drainage");

    let err = model.predict(&query).unwrap_err();
    assert!(err.is_schema_mismatch());
}

// ============================================================================
// Persistence and report
// ============================================================================

#[test]
fn test_artifacts_round_trip() {
    let (_, model) = train("flood_small.csv", 42);
    let dir = tempfile::tempdir().unwrap();
    let layout = ArtifactLayout::new(dir.path());

    let saved = model.save(&layout).unwrap();
    let names: Vec<String> = saved
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "random_forest.bin",
            "Water_Table_label_encoder.bin",
            "urbanization_label_encoder.bin",
            "scaler.bin",
        ]
    );

    let loaded = TrainedModel::load(dir.path()).unwrap();
    assert_eq!(loaded, model);
    assert_eq!(
        loaded.predict(&demo_query()).unwrap(),
        model.predict(&demo_query()).unwrap()
    );
}

#[test]
fn test_loading_missing_artifacts_fails() {
    let dir = tempfile::tempdir().unwrap();

    let err = TrainedModel::load(dir.path()).unwrap_err();
    assert!(matches!(err, LearningError::ModelNotFound { .. }));
}

#[test]
fn test_csv_report_has_probability_columns() {
    let (result, _) = train("flood_small.csv", 42);
    let dir = tempfile::tempdir().unwrap();

    let path = write_report(&result.test_probabilities, dir.path().join("probs.csv")).unwrap();
    let report = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .unwrap()
        .finish()
        .unwrap();

    assert_eq!(report.height(), 2);
    let names: Vec<String> = report
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "Water_Table",
            "urbanization",
            "Elevation",
            "precipitation",
            "runoff_coefficient",
            "drainage",
            "Actual",
            "Probability_Class_0",
            "Probability_Class_1",
        ]
    );
}

#[test]
fn test_xlsx_report_is_written() {
    let (result, _) = train("flood_small.csv", 42);
    let dir = tempfile::tempdir().unwrap();

    let path = write_report(
        &result.test_probabilities,
        dir.path().join("test_probabilities_rf.xlsx"),
    )
    .unwrap();
    assert!(path.is_file());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
