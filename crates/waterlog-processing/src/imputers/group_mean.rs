//! Group-wise mean imputation of sentinel values.
//!
//! Every missing value (the sentinel marker or a null cell) in the imputed
//! column is replaced by the mean of the valid values of that column within
//! the same group. All group means are computed from the untouched column
//! before any replacement is written.

use crate::config::DatasetSchema;
use crate::error::{PreprocessingError, Result};
use crate::utils::{f64_values, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Key printed for rows whose group cell is null.
const NULL_GROUP: &str = "<null>";

/// What the imputer changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationSummary {
    /// Column that was imputed.
    pub column: String,
    /// Number of cells replaced.
    pub replaced: usize,
    /// Mean used per group, only for groups that had missing cells.
    pub group_means: BTreeMap<String, f64>,
}

impl ImputationSummary {
    /// One-line description for logs and processing steps.
    pub fn describe(&self) -> String {
        format!(
            "Filled {} missing value(s) in '{}' with the mean of {} group(s)",
            self.replaced,
            self.column,
            self.group_means.len()
        )
    }
}

/// Replaces a sentinel marker with the mean of its group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMeanImputer {
    group_column: String,
    column: String,
    sentinel: f64,
}

impl GroupMeanImputer {
    /// Create an imputer for `column`, grouped by `group_column`.
    pub fn new(group_column: impl Into<String>, column: impl Into<String>, sentinel: f64) -> Self {
        Self {
            group_column: group_column.into(),
            column: column.into(),
            sentinel,
        }
    }

    /// Create the imputer described by a dataset schema.
    pub fn from_schema(schema: &DatasetSchema) -> Self {
        Self::new(
            schema.group_column.clone(),
            schema.imputed_column.clone(),
            schema.sentinel,
        )
    }

    fn is_missing(&self, value: Option<f64>) -> bool {
        match value {
            Some(v) => v == self.sentinel || v.is_nan(),
            None => true,
        }
    }

    /// Impute the column in place.
    ///
    /// Fails with [`PreprocessingError::ImputationFailed`] when a group that
    /// has missing cells has no valid value to average; the column is left
    /// untouched in that case.
    pub fn impute(&self, df: &mut DataFrame) -> Result<ImputationSummary> {
        let keys = string_values(df, &self.group_column)?;
        let values = f64_values(df, &self.column)?;

        // sum and count of valid values per group
        let mut stats: HashMap<Option<&str>, (f64, usize)> = HashMap::new();
        for (key, value) in keys.iter().zip(values.iter()) {
            let entry = stats.entry(key.as_deref()).or_insert((0.0, 0));
            if !self.is_missing(*value) {
                if let Some(v) = value {
                    entry.0 += v;
                    entry.1 += 1;
                }
            }
        }

        let mut empty_groups: Vec<String> = Vec::new();
        let mut group_means = BTreeMap::new();
        let mut replaced = 0usize;
        let mut result = Vec::with_capacity(values.len());

        for (key, value) in keys.iter().zip(values.iter()) {
            if !self.is_missing(*value) {
                result.push(*value);
                continue;
            }

            let label = key.as_deref().unwrap_or(NULL_GROUP).to_string();
            match stats.get(&key.as_deref()) {
                Some(&(sum, count)) if count > 0 => {
                    let mean = sum / count as f64;
                    group_means.insert(label, mean);
                    result.push(Some(mean));
                    replaced += 1;
                }
                _ => {
                    if !empty_groups.contains(&label) {
                        empty_groups.push(label);
                    }
                    result.push(*value);
                }
            }
        }

        if !empty_groups.is_empty() {
            warn!(
                "Column '{}' has groups with no valid values: {}",
                self.column,
                empty_groups.join(", ")
            );
            return Err(PreprocessingError::ImputationFailed {
                column: self.column.clone(),
                reason: format!(
                    "no valid values to average in {} group(s): {}",
                    self.group_column,
                    empty_groups.join(", ")
                ),
            });
        }

        let series = Series::new(self.column.as_str().into(), result);
        df.with_column(series)?;

        let summary = ImputationSummary {
            column: self.column.clone(),
            replaced,
            group_means,
        };
        debug!("{}", summary.describe());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn imputer() -> GroupMeanImputer {
        GroupMeanImputer::new("Area", "precipitation", -999.0)
    }

    fn precipitation(df: &DataFrame) -> Vec<Option<f64>> {
        f64_values(df, "precipitation").unwrap()
    }

    // ========================================================================
    // impute() tests
    // ========================================================================

    #[test]
    fn test_replaces_sentinel_with_group_mean() {
        let mut df = df![
            "Area" => ["A", "A", "A", "B", "B"],
            "precipitation" => [10.0, -999.0, 20.0, 7.0, -999.0],
        ]
        .unwrap();

        let summary = imputer().impute(&mut df).unwrap();

        assert_eq!(
            precipitation(&df),
            vec![Some(10.0), Some(15.0), Some(20.0), Some(7.0), Some(7.0)]
        );
        assert_eq!(summary.replaced, 2);
        assert_eq!(summary.group_means.get("A"), Some(&15.0));
        assert_eq!(summary.group_means.get("B"), Some(&7.0));
    }

    #[test]
    fn test_sentinel_does_not_pollute_group_mean() {
        let mut df = df![
            "Area" => ["A", "A", "A", "A"],
            "precipitation" => [-999.0, 4.0, -999.0, 8.0],
        ]
        .unwrap();

        imputer().impute(&mut df).unwrap();

        // mean of [4, 8], not of [-999, 4, -999, 8]
        assert_eq!(
            precipitation(&df),
            vec![Some(6.0), Some(4.0), Some(6.0), Some(8.0)]
        );
    }

    #[test]
    fn test_no_sentinel_remains() {
        let mut df = df![
            "Area" => ["A", "B", "A", "C", "C", "B"],
            "precipitation" => [-999.0, 3.0, 1.0, -999.0, 2.0, -999.0],
        ]
        .unwrap();

        imputer().impute(&mut df).unwrap();

        assert!(precipitation(&df)
            .iter()
            .all(|v| v.is_some() && *v != Some(-999.0)));
    }

    #[test]
    fn test_null_cells_are_treated_as_missing() {
        let mut df = df![
            "Area" => ["A", "A"],
            "precipitation" => [Some(5.0), None],
        ]
        .unwrap();

        let summary = imputer().impute(&mut df).unwrap();

        assert_eq!(precipitation(&df), vec![Some(5.0), Some(5.0)]);
        assert_eq!(summary.replaced, 1);
    }

    #[test]
    fn test_no_missing_values_leaves_column_unchanged() {
        let mut df = df![
            "Area" => ["A", "B"],
            "precipitation" => [1.0, 2.0],
        ]
        .unwrap();

        let summary = imputer().impute(&mut df).unwrap();

        assert_eq!(precipitation(&df), vec![Some(1.0), Some(2.0)]);
        assert_eq!(summary.replaced, 0);
        assert!(summary.group_means.is_empty());
    }

    #[test]
    fn test_all_sentinel_group_is_flagged() {
        let mut df = df![
            "Area" => ["A", "A", "B"],
            "precipitation" => [-999.0, -999.0, 3.0],
        ]
        .unwrap();

        let err = imputer().impute(&mut df).unwrap_err();

        match err {
            PreprocessingError::ImputationFailed { column, reason } => {
                assert_eq!(column, "precipitation");
                assert!(reason.contains('A'));
            }
            other => panic!("unexpected error: {other}"),
        }
        // left untouched
        assert_eq!(
            precipitation(&df),
            vec![Some(-999.0), Some(-999.0), Some(3.0)]
        );
    }

    #[test]
    fn test_numeric_group_keys() {
        let mut df = df![
            "Area" => [1i64, 1, 2],
            "precipitation" => [2.0, -999.0, 9.0],
        ]
        .unwrap();

        let summary = imputer().impute(&mut df).unwrap();

        assert_eq!(precipitation(&df), vec![Some(2.0), Some(2.0), Some(9.0)]);
        assert_eq!(summary.group_means.get("1"), Some(&2.0));
    }

    #[test]
    fn test_missing_group_column() {
        let mut df = df!["precipitation" => [1.0]].unwrap();
        let err = imputer().impute(&mut df).unwrap_err();
        assert!(matches!(err, PreprocessingError::ColumnNotFound(name) if name == "Area"));
    }

    #[test]
    fn test_describe() {
        let summary = ImputationSummary {
            column: "precipitation".to_string(),
            replaced: 3,
            group_means: BTreeMap::from([("A".to_string(), 1.0)]),
        };
        assert!(summary.describe().contains("3 missing"));
        assert!(summary.describe().contains("precipitation"));
    }
}
