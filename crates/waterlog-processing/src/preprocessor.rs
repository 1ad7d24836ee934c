//! Fitted feature preprocessing.
//!
//! [`FeaturePreprocessor`] bundles one [`LabelEncoder`] per categorical
//! feature and a single [`StandardScaler`] over the numeric features. It is
//! fitted once on the full (imputed) dataset and then applied identically to
//! the training table and to ad-hoc query records, so a record always reaches
//! the model in the fitted feature order and encoding.

use crate::config::DatasetSchema;
use crate::error::{PreprocessingError, Result};
use crate::transformers::{LabelEncoder, StandardScaler};
use crate::utils::{format_number, require_columns};
use polars::prelude::*;
use serde_json::Value;
use tracing::info;

/// Encoders and scaler fitted on one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePreprocessor {
    encoders: Vec<LabelEncoder>,
    scaler: StandardScaler,
}

static_assertions::assert_impl_all!(FeaturePreprocessor: Send, Sync);

impl FeaturePreprocessor {
    /// Fit encoders and scaler on the schema's feature columns.
    pub fn fit(df: &DataFrame, schema: &DatasetSchema) -> Result<Self> {
        require_columns(df, &schema.feature_names())?;

        let encoders = schema
            .categorical_features
            .iter()
            .map(|feature| LabelEncoder::fit(df, feature))
            .collect::<Result<Vec<_>>>()?;
        let scaler = StandardScaler::fit(df, &schema.numerical_features)?;

        for encoder in &encoders {
            info!(
                "Encoded '{}' into {} classes",
                encoder.feature(),
                encoder.classes().len()
            );
        }
        info!("Scaled {} numeric feature(s)", scaler.features().len());

        Ok(Self { encoders, scaler })
    }

    /// Fit on `df` and return the transformed feature table.
    pub fn fit_transform(df: &DataFrame, schema: &DatasetSchema) -> Result<(Self, DataFrame)> {
        let preprocessor = Self::fit(df, schema)?;
        let transformed = preprocessor.transform(df)?;
        Ok((preprocessor, transformed))
    }

    /// Reassemble from persisted parts.
    ///
    /// Feature order is taken from the parts: encoders first, then the
    /// scaler's features.
    pub fn from_parts(encoders: Vec<LabelEncoder>, scaler: StandardScaler) -> Result<Self> {
        let preprocessor = Self { encoders, scaler };
        let names = preprocessor.feature_names();
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) {
                return Err(PreprocessingError::InvalidConfig(format!(
                    "feature '{}' appears in more than one transformer",
                    name
                )));
            }
        }
        Ok(preprocessor)
    }

    /// Feature names in model order.
    pub fn feature_names(&self) -> Vec<String> {
        self.encoders
            .iter()
            .map(|e| e.feature().to_string())
            .chain(self.scaler.features().iter().cloned())
            .collect()
    }

    pub fn encoders(&self) -> &[LabelEncoder] {
        &self.encoders
    }

    /// Encoder fitted on `feature`, if it is categorical.
    pub fn encoder(&self, feature: &str) -> Option<&LabelEncoder> {
        self.encoders.iter().find(|e| e.feature() == feature)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Transform the feature columns of `df`.
    ///
    /// Returns a new frame holding only the features, in model order:
    /// categorical codes as `Int64`, standardized numbers as `Float64`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let names = self.feature_names();
        require_columns(df, &names)?;

        let mut out = df.select(names.iter().map(String::as_str))?;
        for encoder in &self.encoders {
            encoder.transform(&mut out)?;
        }
        self.scaler.transform(&mut out)?;
        Ok(out)
    }

    /// Transform one raw record into a feature row in model order.
    ///
    /// The record must be a JSON object with every feature present. Fields
    /// not used by the model are ignored.
    pub fn transform_record(&self, record: &Value) -> Result<Vec<f64>> {
        let object = record.as_object().ok_or_else(|| PreprocessingError::SchemaMismatch {
            field: "record".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let lookup = |feature: &str| {
            object.get(feature).ok_or_else(|| PreprocessingError::SchemaMismatch {
                field: feature.to_string(),
                reason: "missing from record".to_string(),
            })
        };

        let mut row = Vec::with_capacity(self.encoders.len() + self.scaler.features().len());

        for encoder in &self.encoders {
            let category = match lookup(encoder.feature())? {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => match n.as_f64() {
                    Some(v) => format_number(v),
                    None => n.to_string(),
                },
                other => {
                    return Err(PreprocessingError::SchemaMismatch {
                        field: encoder.feature().to_string(),
                        reason: format!("expected a category, got {}", kind_of(other)),
                    });
                }
            };
            row.push(encoder.transform_value(&category)? as f64);
        }

        let mut numbers = Vec::with_capacity(self.scaler.features().len());
        for feature in self.scaler.features() {
            let value = lookup(feature)?;
            let number = value
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PreprocessingError::SchemaMismatch {
                    field: feature.clone(),
                    reason: format!("expected a number, got {}", kind_of(value)),
                })?;
            numbers.push(number);
        }
        row.extend(self.scaler.transform_row(&numbers)?);

        Ok(row)
    }

    /// Parse a JSON object from text and transform it like [`transform_record`](Self::transform_record).
    pub fn transform_json(&self, text: &str) -> Result<Vec<f64>> {
        let record: Value = serde_json::from_str(text)?;
        self.transform_record(&record)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
