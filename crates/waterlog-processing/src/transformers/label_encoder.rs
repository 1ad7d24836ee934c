//! Label encoding of one categorical feature.

use crate::error::{PreprocessingError, Result};
use crate::utils::string_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fitted mapping from category strings to integer codes.
///
/// Codes are the positions of the categories in sorted order, so fitting
/// twice on the same values always yields the same mapping. There is no
/// unfitted state: a `LabelEncoder` only comes from [`LabelEncoder::fit`]
/// or from a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    feature: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on every observed value of `feature`.
    ///
    /// Null cells are rejected; a missing category is not a category.
    pub fn fit(df: &DataFrame, feature: &str) -> Result<Self> {
        let values = string_values(df, feature)?;
        let mut classes = BTreeSet::new();
        for (row, value) in values.into_iter().enumerate() {
            match value {
                Some(v) => {
                    classes.insert(v);
                }
                None => {
                    return Err(PreprocessingError::SchemaMismatch {
                        field: feature.to_string(),
                        reason: format!("null category at row {}", row),
                    });
                }
            }
        }

        if classes.is_empty() {
            return Err(PreprocessingError::NoValidValues(feature.to_string()));
        }

        Ok(Self {
            feature: feature.to_string(),
            classes: classes.into_iter().collect(),
        })
    }

    /// Feature this encoder was fitted on.
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Known categories in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code of a single category.
    pub fn transform_value(&self, value: &str) -> Result<i64> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map(|idx| idx as i64)
            .map_err(|_| PreprocessingError::UnknownCategory {
                feature: self.feature.clone(),
                value: value.to_string(),
            })
    }

    /// Category of a code.
    pub fn inverse_transform(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    /// Replace the feature column with its `Int64` codes.
    pub fn transform(&self, df: &mut DataFrame) -> Result<()> {
        let values = string_values(df, &self.feature)?;
        let codes = values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) => self.transform_value(&v),
                None => Err(PreprocessingError::SchemaMismatch {
                    field: self.feature.clone(),
                    reason: format!("null category at row {}", row),
                }),
            })
            .collect::<Result<Vec<i64>>>()?;

        df.with_column(Series::new(self.feature.as_str().into(), codes))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        df!["Water_Table" => ["Low", "High", "Medium", "High"]].unwrap()
    }

    #[test]
    fn test_codes_follow_sorted_order() {
        let encoder = LabelEncoder::fit(&frame(), "Water_Table").unwrap();
        assert_eq!(encoder.classes(), &["High", "Low", "Medium"]);
        assert_eq!(encoder.transform_value("High").unwrap(), 0);
        assert_eq!(encoder.transform_value("Low").unwrap(), 1);
        assert_eq!(encoder.transform_value("Medium").unwrap(), 2);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let first = LabelEncoder::fit(&frame(), "Water_Table").unwrap();
        let second = LabelEncoder::fit(&frame(), "Water_Table").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let encoder = LabelEncoder::fit(&frame(), "Water_Table").unwrap();
        let err = encoder.transform_value("Hgih").unwrap_err();
        assert!(err.is_unknown_category());
        assert!(err.to_string().contains("Hgih"));
    }

    #[test]
    fn test_transform_replaces_column_with_codes() {
        let mut df = frame();
        let encoder = LabelEncoder::fit(&df, "Water_Table").unwrap();
        encoder.transform(&mut df).unwrap();

        let column = df.column("Water_Table").unwrap();
        assert_eq!(column.dtype(), &DataType::Int64);
        let codes: Vec<Option<i64>> = column.as_materialized_series().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(1), Some(0), Some(2), Some(0)]);
    }

    #[test]
    fn test_inverse_transform() {
        let encoder = LabelEncoder::fit(&frame(), "Water_Table").unwrap();
        assert_eq!(encoder.inverse_transform(2), Some("Medium"));
        assert_eq!(encoder.inverse_transform(3), None);
        assert_eq!(encoder.inverse_transform(-1), None);
    }

    #[test]
    fn test_null_category_is_rejected_at_fit() {
        let df = df!["urbanization" => [Some("Good"), None]].unwrap();
        let err = LabelEncoder::fit(&df, "urbanization").unwrap_err();
        assert!(err.is_schema_mismatch());
    }
}
