//! Dataset schema configuration.
//!
//! [`DatasetSchema`] names the role of every input column: the grouping key
//! used by the imputer, the categorical and numeric features (in the order
//! the model sees them), the binary target, and the sentinel marker for
//! missing values. The default describes the water-logging dataset.
//!
//! # Example
//!
//! ```rust,ignore
//! use waterlog_processing::DatasetSchema;
//!
//! let schema = DatasetSchema::builder()
//!     .target("label")
//!     .sentinel(-1.0)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default sentinel value standing in for "missing" in the raw data.
pub const DEFAULT_SENTINEL: f64 = -999.0;

/// Column roles of the training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Grouping key used only while imputing.
    /// Default: "Area"
    pub group_column: String,

    /// Numeric column whose sentinel values are imputed.
    /// Default: "precipitation"
    pub imputed_column: String,

    /// Marker value meaning "missing" in `imputed_column`.
    /// Default: -999
    pub sentinel: f64,

    /// Categorical features, label-encoded. Come first in feature order.
    pub categorical_features: Vec<String>,

    /// Numeric features, standardized. Follow the categorical ones.
    pub numerical_features: Vec<String>,

    /// Binary label column.
    /// Default: "output"
    pub target: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self {
            group_column: "Area".to_string(),
            imputed_column: "precipitation".to_string(),
            sentinel: DEFAULT_SENTINEL,
            categorical_features: vec!["Water_Table".to_string(), "urbanization".to_string()],
            numerical_features: vec![
                "Elevation".to_string(),
                "precipitation".to_string(),
                "runoff_coefficient".to_string(),
                "drainage".to_string(),
            ],
            target: "output".to_string(),
        }
    }
}

impl DatasetSchema {
    /// Create a new schema builder seeded with the default dataset layout.
    pub fn builder() -> DatasetSchemaBuilder {
        DatasetSchemaBuilder::default()
    }

    /// Feature names in model order: categorical first, then numeric.
    pub fn feature_names(&self) -> Vec<String> {
        self.categorical_features
            .iter()
            .chain(self.numerical_features.iter())
            .cloned()
            .collect()
    }

    /// Every column the input table must provide.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![self.group_column.clone()];
        for name in self.feature_names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        if !columns.contains(&self.target) {
            columns.push(self.target.clone());
        }
        columns
    }

    /// Validate the schema and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.categorical_features.is_empty() && self.numerical_features.is_empty() {
            return Err(ConfigValidationError::NoFeatures);
        }

        let mut seen = HashSet::new();
        for name in self.feature_names() {
            if !seen.insert(name.clone()) {
                return Err(ConfigValidationError::DuplicateFeature(name));
            }
        }

        if seen.contains(&self.target) {
            return Err(ConfigValidationError::TargetIsFeature(self.target.clone()));
        }

        if !self.numerical_features.contains(&self.imputed_column) {
            return Err(ConfigValidationError::ImputedColumnNotNumeric(
                self.imputed_column.clone(),
            ));
        }

        if !self.sentinel.is_finite() {
            return Err(ConfigValidationError::InvalidSentinel(self.sentinel));
        }

        Ok(())
    }
}

/// Errors that can occur during schema validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Schema has no feature columns")]
    NoFeatures,

    #[error("Feature '{0}' is listed more than once")]
    DuplicateFeature(String),

    #[error("Target '{0}' is also listed as a feature")]
    TargetIsFeature(String),

    #[error("Imputed column '{0}' must be one of the numerical features")]
    ImputedColumnNotNumeric(String),

    #[error("Invalid sentinel value: {0} (must be finite)")]
    InvalidSentinel(f64),
}

/// Builder for [`DatasetSchema`] with fluent API.
#[derive(Debug, Default)]
pub struct DatasetSchemaBuilder {
    group_column: Option<String>,
    imputed_column: Option<String>,
    sentinel: Option<f64>,
    categorical_features: Option<Vec<String>>,
    numerical_features: Option<Vec<String>>,
    target: Option<String>,
}

impl DatasetSchemaBuilder {
    /// Set the grouping key used for imputation.
    pub fn group_column(mut self, column: impl Into<String>) -> Self {
        self.group_column = Some(column.into());
        self
    }

    /// Set the numeric column whose sentinel values are imputed.
    pub fn imputed_column(mut self, column: impl Into<String>) -> Self {
        self.imputed_column = Some(column.into());
        self
    }

    /// Set the sentinel marker for missing values.
    pub fn sentinel(mut self, sentinel: f64) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    /// Set the categorical features (label-encoded).
    pub fn categorical_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Set the numeric features (standardized).
    pub fn numerical_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numerical_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Set the binary target column.
    pub fn target(mut self, column: impl Into<String>) -> Self {
        self.target = Some(column.into());
        self
    }

    /// Build the schema.
    ///
    /// Returns a validated `DatasetSchema` or an error if validation fails.
    pub fn build(self) -> Result<DatasetSchema, ConfigValidationError> {
        let defaults = DatasetSchema::default();
        let schema = DatasetSchema {
            group_column: self.group_column.unwrap_or(defaults.group_column),
            imputed_column: self.imputed_column.unwrap_or(defaults.imputed_column),
            sentinel: self.sentinel.unwrap_or(defaults.sentinel),
            categorical_features: self
                .categorical_features
                .unwrap_or(defaults.categorical_features),
            numerical_features: self.numerical_features.unwrap_or(defaults.numerical_features),
            target: self.target.unwrap_or(defaults.target),
        };

        schema.validate()?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_schema() {
        let schema = DatasetSchema::default();
        assert_eq!(schema.group_column, "Area");
        assert_eq!(schema.imputed_column, "precipitation");
        assert_eq!(schema.sentinel, -999.0);
        assert_eq!(schema.target, "output");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_feature_order_is_categorical_then_numeric() {
        let schema = DatasetSchema::default();
        assert_eq!(
            schema.feature_names(),
            vec![
                "Water_Table",
                "urbanization",
                "Elevation",
                "precipitation",
                "runoff_coefficient",
                "drainage",
            ]
        );
    }

    #[test]
    fn test_required_columns_include_group_and_target() {
        let columns = DatasetSchema::default().required_columns();
        assert_eq!(columns.first().map(String::as_str), Some("Area"));
        assert_eq!(columns.last().map(String::as_str), Some("output"));
        assert_eq!(columns.len(), 8);
    }

    #[test]
    fn test_builder_overrides() {
        let schema = DatasetSchema::builder()
            .group_column("Region")
            .sentinel(-1.0)
            .target("flooded")
            .build()
            .unwrap();

        assert_eq!(schema.group_column, "Region");
        assert_eq!(schema.sentinel, -1.0);
        assert_eq!(schema.target, "flooded");
        assert_eq!(schema.categorical_features.len(), 2);
    }

    #[test]
    fn test_validation_duplicate_feature() {
        let result = DatasetSchema::builder()
            .categorical_features(["drainage"])
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateFeature(name) if name == "drainage"
        ));
    }

    #[test]
    fn test_validation_target_is_feature() {
        let result = DatasetSchema::builder().target("Elevation").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::TargetIsFeature(_)
        ));
    }

    #[test]
    fn test_validation_imputed_column_must_be_numeric() {
        let result = DatasetSchema::builder().imputed_column("Water_Table").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ImputedColumnNotNumeric(_)
        ));
    }

    #[test]
    fn test_schema_serialization() {
        let schema = DatasetSchema::default();
        let json = serde_json::to_string(&schema).unwrap();
        let deserialized: DatasetSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, deserialized);
    }
}
