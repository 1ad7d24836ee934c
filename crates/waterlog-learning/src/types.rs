//! Result types returned by the training pipeline and the trained model.
//!
//! # Overview
//!
//! - [`TrainingResult`]: complete result from [`Pipeline::train()`](crate::Pipeline::train)
//! - [`FeatureImportance`]: one row of the ranked importance table
//! - [`PredictionResult`]: result from [`TrainedModel::predict()`](crate::TrainedModel::predict)

use crate::metrics::{ClassificationMetrics, ClassificationReport};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use waterlog_processing::ImputationSummary;

/// Result of a training run.
///
/// Serializes to JSON for `--json` output; the test-probability table is
/// skipped there and written to its own report file instead.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct TrainingResult {
    /// Metrics on the held-out rows.
    pub metrics: ClassificationMetrics,

    /// Feature importances sorted in descending order. Sum to 1.0.
    pub feature_importance: Vec<FeatureImportance>,

    /// What the imputer replaced before fitting.
    pub imputation: ImputationSummary,

    /// Held-out feature rows (encoded and scaled, model order) followed by
    /// `Actual`, `Probability_Class_0` and `Probability_Class_1`.
    #[serde(skip)]
    pub test_probabilities: DataFrame,

    /// Rows used to fit the forest.
    pub train_size: usize,

    /// Rows held out for evaluation.
    pub test_size: usize,

    /// Wall-clock time from imputation to evaluation.
    pub training_time_seconds: f64,
}

impl TrainingResult {
    /// Per-class classification report.
    pub fn report(&self) -> &ClassificationReport {
        &self.metrics.report
    }
}

/// Importance of one input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Render a ranked importance table with a `Feature` / `Importance` header.
pub struct ImportanceTable<'a>(pub &'a [FeatureImportance]);

impl fmt::Display for ImportanceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .map(|row| row.feature.len())
            .max()
            .unwrap_or(0)
            .max("Feature".len());

        writeln!(f, "{:<width$}  {:>10}", "Feature", "Importance")?;
        for row in self.0 {
            writeln!(f, "{:<width$}  {:>10.6}", row.feature, row.importance)?;
        }
        Ok(())
    }
}

/// Result of a single prediction.
///
/// Returned by [`TrainedModel::predict()`](crate::TrainedModel::predict).
///
/// # Example
///
/// ```ignore
/// let result = model.predict(&json!({
///     "Water_Table": "High", "urbanization": "Good",
///     "Elevation": 5, "precipitation": 30,
///     "runoff_coefficient": 0.6, "drainage": 25
/// }))?;
///
/// println!("Prediction: {}", result.label);
/// println!("Probabilities: {:?}", result.probabilities);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PredictionResult {
    /// Predicted class, `0` or `1`.
    pub label: usize,

    /// Vote fraction of each class, indexed by class. Sums to 1.0.
    pub probabilities: Vec<f64>,

    /// Probability of the predicted class.
    pub confidence: f64,
}

impl PredictionResult {
    pub(crate) fn from_votes(label: usize, probabilities: Vec<f64>) -> Self {
        let confidence = probabilities.get(label).copied().unwrap_or(0.0);
        Self {
            label,
            probabilities,
            confidence,
        }
    }
}
