//! Custom error types for loading and preprocessing.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! loader, the imputer and the fitted transformers. Query-time failures
//! ([`PreprocessingError::UnknownCategory`], [`PreprocessingError::SchemaMismatch`])
//! live here too because the query path reuses the same fitted transformers.

use thiserror::Error;

/// The main error type for loading and preprocessing.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A record or table does not match the fitted feature schema.
    #[error("Schema mismatch for field '{field}': {reason}")]
    SchemaMismatch { field: String, reason: String },

    /// A categorical value was not observed when the encoder was fitted.
    #[error("Unknown category '{value}' for feature '{feature}'")]
    UnknownCategory { feature: String, value: String },

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Imputation failed.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input file extension is not a supported table format.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// Spreadsheet workbook could not be opened or read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable, machine-readable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Workbook(_) => "WORKBOOK_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is an unseen categorical value.
    pub fn is_unknown_category(&self) -> bool {
        match self {
            Self::UnknownCategory { .. } => true,
            Self::WithContext { source, .. } => source.is_unknown_category(),
            _ => false,
        }
    }

    /// Check if this error is a record/schema mismatch.
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            Self::SchemaMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_mismatch(),
            _ => false,
        }
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PreprocessingError::ColumnNotFound("Area".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PreprocessingError::UnknownCategory {
                feature: "Water_Table".to_string(),
                value: "Hgih".to_string(),
            }
            .error_code(),
            "UNKNOWN_CATEGORY"
        );
    }

    #[test]
    fn test_unknown_category_message_names_feature_and_value() {
        let error = PreprocessingError::UnknownCategory {
            feature: "urbanization".to_string(),
            value: "Excellent".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("urbanization"));
        assert!(message.contains("Excellent"));
    }

    #[test]
    fn test_with_context_preserves_kind() {
        let error = PreprocessingError::SchemaMismatch {
            field: "drainage".to_string(),
            reason: "missing".to_string(),
        }
        .with_context("While preparing query");

        assert!(error.to_string().contains("While preparing query"));
        assert_eq!(error.error_code(), "SCHEMA_MISMATCH");
        assert!(error.is_schema_mismatch());
        assert!(!error.is_unknown_category());
    }

    #[test]
    fn test_polars_result_context() {
        let result: std::result::Result<(), polars::error::PolarsError> = Err(
            polars::error::PolarsError::ColumnNotFound("x".into()),
        );
        let error = result.context("Reading column").unwrap_err();
        assert_eq!(error.error_code(), "POLARS_ERROR");
    }
}
