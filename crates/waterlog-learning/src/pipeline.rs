//! Training pipeline implementation.
//!
//! This module provides the [`Pipeline`] struct and its builder. The
//! pipeline runs these stages in order:
//!
//! 1. **Imputing** - Fill sentinel values with the mean of their group
//! 2. **Preprocessing** - Label-encode categorical features, standardize numeric ones
//! 3. **Splitting** - Hold out a seeded share of rows for evaluation
//! 4. **Training** - Grow the random forest on the training rows
//! 5. **Evaluation** - Score the held-out rows and build the probability table
//!
//! # Example
//!
//! ```rust,ignore
//! use waterlog_learning::{Pipeline, PipelineConfig};
//! use waterlog_processing::load_dataset;
//!
//! let config = PipelineConfig::default();
//! let df = load_dataset("combined_manual (5).xlsx", "Sheet1", &config.schema)?;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:?}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let (result, model) = pipeline.train(&df)?;
//! println!("Accuracy: {:.2}", result.metrics.accuracy);
//! ```

use crate::config::PipelineConfig;
use crate::error::{LearningError, Result};
use crate::forest::RandomForest;
use crate::metrics::evaluate;
use crate::model::TrainedModel;
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::report::probability_table;
use crate::split::TrainTestSplit;
use crate::types::TrainingResult;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};
use waterlog_processing::{FeaturePreprocessor, GroupMeanImputer, f64_values};

/// The training pipeline.
///
/// Use [`Pipeline::builder()`] to construct a pipeline with the builder pattern.
/// A pipeline holds no fitted state; every call to [`train()`](Self::train)
/// fits from scratch and hands back the fitted [`TrainedModel`].
pub struct Pipeline {
    config: PipelineConfig,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Pipeline {
    /// Create a new builder for `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the pipeline on a loaded table.
    ///
    /// `df` must contain the schema's group column, feature columns and
    /// target. The target must hold only `0` and `1`.
    ///
    /// # Errors
    ///
    /// - [`TargetNotFound`](LearningError::TargetNotFound): target column absent
    /// - [`InvalidData`](LearningError::InvalidData): null or non-binary labels,
    ///   null features after preprocessing, or too few rows to split
    /// - [`Preprocessing`](LearningError::Preprocessing): a missing column, an
    ///   unimputable group, or a null category
    pub fn train(&self, df: &DataFrame) -> Result<(TrainingResult, TrainedModel)> {
        let started = Instant::now();
        let schema = &self.config.schema;

        self.report(TrainingStage::Initializing, 0.0, "Validating input table");
        let labels = read_labels(df, &schema.target)?;
        info!("Training on {} rows", df.height());

        self.report(TrainingStage::Imputing, 0.1, "Imputing missing values");
        let mut imputed = df.clone();
        let imputation = GroupMeanImputer::from_schema(schema).impute(&mut imputed)?;
        info!("{}", imputation.describe());

        self.report(TrainingStage::Preprocessing, 0.2, "Encoding and scaling features");
        let (preprocessor, features) = FeaturePreprocessor::fit_transform(&imputed, schema)?;
        let x = feature_matrix(&features)?;

        self.report(TrainingStage::Splitting, 0.3, "Splitting train and test rows");
        let split = TrainTestSplit::new(x.nrows(), self.config.test_size, self.config.split_seed)?;
        info!(
            "Split {} rows into {} train / {} test",
            x.nrows(),
            split.train.len(),
            split.test.len()
        );

        let x_train = x.select(Axis(0), &split.train);
        let y_train: Array1<usize> = split.train.iter().map(|&i| labels[i]).collect();
        let x_test = x.select(Axis(0), &split.test);
        let y_test: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

        if let Some(&only) = y_train.first().filter(|&&c| y_train.iter().all(|&y| y == c)) {
            return Err(LearningError::TrainingFailed(format!(
                "training rows hold only class {}; both classes are required",
                only
            )));
        }

        self.report(
            TrainingStage::Training,
            0.4,
            format!("Growing {} trees", self.config.forest.n_estimators),
        );
        let forest = RandomForest::fit(&self.config.forest, &x_train, &y_train)?;

        self.report(TrainingStage::Evaluation, 0.9, "Evaluating held-out rows");
        let y_pred = forest.predict(&x_test)?.to_vec();
        let proba = forest.predict_proba(&x_test)?;
        let metrics = evaluate(&y_test, &y_pred)?;

        let test_rows = IdxCa::from_vec(
            "test_rows".into(),
            split.test.iter().map(|&i| i as IdxSize).collect(),
        );
        let test_probabilities = probability_table(&features.take(&test_rows)?, &y_test, &proba)?;

        let model = TrainedModel::new(forest, preprocessor)?;
        let training_time_seconds = started.elapsed().as_secs_f64();
        info!(
            "Training finished in {:.2}s (accuracy {:.2})",
            training_time_seconds, metrics.accuracy
        );

        let result = TrainingResult {
            metrics,
            feature_importance: model.feature_importance(),
            imputation,
            test_probabilities,
            train_size: split.train.len(),
            test_size: split.test.len(),
            training_time_seconds,
        };

        self.report(TrainingStage::Complete, 1.0, "Training complete");
        Ok((result, model))
    }

    /// Get the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn report(&self, stage: TrainingStage, progress: f64, message: impl Into<String>) {
        let update = ProgressUpdate::new(stage, progress, message);
        debug!("[{}] {}", update.stage.as_str(), update.message);
        if let Some(callback) = &self.progress_callback {
            callback(update);
        }
    }
}

/// Read the target as class indices, accepting only `0` and `1`.
fn read_labels(df: &DataFrame, target: &str) -> Result<Vec<usize>> {
    if df.column(target).is_err() {
        return Err(LearningError::TargetNotFound(target.to_string()));
    }

    f64_values(df, target)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            Some(v) => Err(LearningError::InvalidData(format!(
                "target '{}' must be 0 or 1, found {} at row {}",
                target, v, row
            ))),
            None => Err(LearningError::InvalidData(format!(
                "target '{}' is missing at row {}",
                target, row
            ))),
        })
        .collect()
}

/// Copy the transformed feature columns into a dense row-major matrix.
fn feature_matrix(features: &DataFrame) -> Result<Array2<f64>> {
    let columns = features
        .get_column_names()
        .iter()
        .map(|name| {
            f64_values(features, name.as_str())?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value.ok_or_else(|| {
                        LearningError::InvalidData(format!(
                            "feature '{}' is missing at row {} after preprocessing",
                            name, row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn(
        (features.height(), columns.len()),
        |(row, col)| columns[col][row],
    ))
}

/// Builder for [`Pipeline`].
///
/// Created via [`Pipeline::builder()`].
///
/// # Required Configuration
///
/// - [`config()`](Self::config): Pipeline configuration
///
/// # Optional Configuration
///
/// - [`on_progress()`](Self::on_progress): Progress callback for monitoring
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineBuilder {
    /// Set the pipeline configuration (required).
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the progress callback (optional).
    ///
    /// The callback runs on the training thread and should return quickly.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(std::sync::Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if no configuration was provided.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("Pipeline config is required".to_string())
        })?;

        Ok(Pipeline {
            config,
            progress_callback: self.progress_callback,
        })
    }
}
