//! Standardization of numeric features.

use crate::error::{PreprocessingError, Result};
use crate::utils::f64_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted per-feature mean and scale.
///
/// `scale` is the population standard deviation; a constant column gets a
/// scale of 1.0 so the transform stays finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    features: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on the named numeric columns.
    pub fn fit(df: &DataFrame, features: &[String]) -> Result<Self> {
        let mut means = Vec::with_capacity(features.len());
        let mut scales = Vec::with_capacity(features.len());

        for feature in features {
            let values = f64_values(df, feature)?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value.filter(|v| v.is_finite()).ok_or_else(|| PreprocessingError::SchemaMismatch {
                        field: feature.clone(),
                        reason: format!("missing or non-numeric value at row {}", row),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            if values.is_empty() {
                return Err(PreprocessingError::NoValidValues(feature.clone()));
            }

            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            let scale = if std > 0.0 { std } else { 1.0 };

            debug!("Scaler '{}': mean={:.4}, scale={:.4}", feature, mean, scale);
            means.push(mean);
            scales.push(scale);
        }

        Ok(Self {
            features: features.to_vec(),
            means,
            scales,
        })
    }

    /// Features in fit order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Standardize one value of the feature at `idx`.
    #[inline]
    pub fn scale_value(&self, idx: usize, value: f64) -> f64 {
        (value - self.means[idx]) / self.scales[idx]
    }

    /// Standardize a row given in fit order.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.features.len() {
            return Err(PreprocessingError::SchemaMismatch {
                field: "numerical_features".to_string(),
                reason: format!("expected {} values, got {}", self.features.len(), row.len()),
            });
        }
        Ok(row
            .iter()
            .enumerate()
            .map(|(idx, value)| self.scale_value(idx, *value))
            .collect())
    }

    /// Undo [`StandardScaler::transform_row`].
    pub fn inverse_transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(value, (mean, scale))| value * scale + mean)
            .collect()
    }

    /// Replace every fitted column with its standardized values.
    pub fn transform(&self, df: &mut DataFrame) -> Result<()> {
        for (idx, feature) in self.features.iter().enumerate() {
            let scaled: Vec<Option<f64>> = f64_values(df, feature)?
                .into_iter()
                .map(|value| value.map(|v| self.scale_value(idx, v)))
                .collect();
            df.with_column(Series::new(feature.as_str().into(), scaled))?;
        }
        Ok(())
    }
}
