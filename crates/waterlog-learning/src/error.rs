//! Error types for the waterlog-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! Preprocessing failures (unknown categories, schema mismatches, imputation
//! failures) are wrapped unchanged in [`LearningError::Preprocessing`] so the
//! caller can still ask [`LearningError::is_unknown_category`] and friends.
//!
//! # Example
//!
//! ```no_run
//! use waterlog_learning::{LearningError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, LearningError> {
//!     // Errors are propagated with ?
//!     let config = PipelineConfig::builder().test_size(0.25).build()?;
//!     Ok(config)
//! }
//! ```

use thiserror::Error;
use waterlog_processing::PreprocessingError;

/// The main error type for training, evaluation, persistence and inference.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the pipeline or the forest.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - Empty feature matrix, or features and labels of different lengths
    /// - Non-finite feature values
    /// - A label that is not `0` or `1`
    /// - A prediction row whose width differs from the fitted feature count
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The target column was not found in the table.
    ///
    /// Column names are case-sensitive.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// Training could not produce a model.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// An artifact file does not exist.
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path that was not found.
        path: String,
    },

    /// An error occurred during inference/prediction.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Loading, imputation, encoding or scaling failed.
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    /// An artifact or JSON document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The test-probability workbook could not be written.
    #[error("Report error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error during artifact or report file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LearningError {
    /// Stable, machine-readable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::InferenceError(_) => "INFERENCE_ERROR",
            Self::Preprocessing(inner) => inner.error_code(),
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Report(_) => "REPORT_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Check if this error is a categorical value unseen at fit time.
    pub fn is_unknown_category(&self) -> bool {
        matches!(self, Self::Preprocessing(inner) if inner.is_unknown_category())
    }

    /// Check if this error is a record that does not match the feature schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::Preprocessing(inner) if inner.is_schema_mismatch())
    }
}

impl From<bincode::Error> for LearningError {
    fn from(err: bincode::Error) -> Self {
        LearningError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LearningError {
    fn from(err: serde_json::Error) -> Self {
        LearningError::Serialization(err.to_string())
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
