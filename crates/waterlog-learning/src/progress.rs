//! Progress reporting types for the training pipeline.
//!
//! This module defines [`TrainingStage`], [`ProgressUpdate`] and the
//! [`ProgressCallback`] type alias.
//!
//! # Example
//!
//! ```
//! use waterlog_learning::{Pipeline, PipelineConfig, ProgressUpdate};
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_progress(|update: ProgressUpdate| {
//!         println!(
//!             "[{}] {:.0}% - {}",
//!             update.stage.as_str(),
//!             update.progress * 100.0,
//!             update.message
//!         );
//!     })
//!     .build();
//! ```

use std::str::FromStr;
use std::sync::Arc;

/// The current stage of the training pipeline.
///
/// Training progresses through these stages in order:
///
/// 1. [`Initializing`](Self::Initializing) - Validating the input table
/// 2. [`Imputing`](Self::Imputing) - Filling sentinel values with group means
/// 3. [`Preprocessing`](Self::Preprocessing) - Encoding and scaling features
/// 4. [`Splitting`](Self::Splitting) - Holding out the evaluation rows
/// 5. [`Training`](Self::Training) - Growing the forest
/// 6. [`Evaluation`](Self::Evaluation) - Scoring the held-out rows
/// 7. [`Complete`](Self::Complete) - Training finished successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TrainingStage {
    #[default]
    Initializing,
    Imputing,
    Preprocessing,
    Splitting,
    Training,
    Evaluation,
    /// Terminal state. The training result is available.
    Complete,
}

impl TrainingStage {
    /// Returns the snake_case name of the stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use waterlog_learning::TrainingStage;
    ///
    /// assert_eq!(TrainingStage::Training.as_str(), "training");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "initializing",
            TrainingStage::Imputing => "imputing",
            TrainingStage::Preprocessing => "preprocessing",
            TrainingStage::Splitting => "splitting",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Complete => "complete",
        }
    }

    /// Returns `true` if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete)
    }
}

/// Error type for parsing a [`TrainingStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: initializing, imputing, \
             preprocessing, splitting, training, evaluation, complete",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(TrainingStage::Initializing),
            "imputing" => Ok(TrainingStage::Imputing),
            "preprocessing" => Ok(TrainingStage::Preprocessing),
            "splitting" => Ok(TrainingStage::Splitting),
            "training" => Ok(TrainingStage::Training),
            "evaluation" => Ok(TrainingStage::Evaluation),
            "complete" => Ok(TrainingStage::Complete),
            _ => Err(ParseTrainingStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A progress update from the training pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    /// The current training stage.
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0, increasing monotonically.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: TrainingStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
        }
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

/// Type alias for a progress callback function.
///
/// The callback should execute quickly; training waits for it.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
