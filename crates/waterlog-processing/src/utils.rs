//! Shared column helpers.
//!
//! Small conversions used by the loader, the imputer and the transformers to
//! read polars columns as plain Rust values with a consistent error type.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Look up a column, reporting a missing one as [`PreprocessingError::ColumnNotFound`].
pub fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| PreprocessingError::ColumnNotFound(name.to_string()))
}

/// Read a column as `f64` values, keeping nulls.
///
/// Numeric columns of any width are cast. String columns are parsed; a cell
/// that cannot be parsed becomes null, matching a non-strict cast.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = column_series(df, name)?;
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Read a column as owned strings, keeping nulls.
///
/// Numbers are rendered without a trailing `.0` so that `3.0` read from a
/// workbook and `3` read from a CSV produce the same key.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = column_series(df, name)?;
    if is_numeric_dtype(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|value| value.map(format_number))
            .collect());
    }

    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Render a number the way a categorical key is compared.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Ensure every named column exists in the frame.
pub fn require_columns(df: &DataFrame, columns: &[String]) -> Result<()> {
    let present = df.get_column_names();
    for name in columns {
        if !present.iter().any(|c| c.as_str() == name.as_str()) {
            return Err(PreprocessingError::ColumnNotFound(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_f64_values_casts_integers() {
        let df = df!["x" => [1i64, 2, 3]].unwrap();
        assert_eq!(f64_values(&df, "x").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_f64_values_keeps_nulls() {
        let df = df!["x" => [Some(1.5), None]].unwrap();
        assert_eq!(f64_values(&df, "x").unwrap(), vec![Some(1.5), None]);
    }

    #[test]
    fn test_string_values_renders_whole_numbers_without_fraction() {
        let df = df!["area" => [1.0, 2.5]].unwrap();
        assert_eq!(
            string_values(&df, "area").unwrap(),
            vec![Some("1".to_string()), Some("2.5".to_string())]
        );
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let df = df!["x" => [1.0]].unwrap();
        let err = f64_values(&df, "y").unwrap_err();
        assert!(matches!(err, PreprocessingError::ColumnNotFound(name) if name == "y"));
    }

    #[test]
    fn test_require_columns() {
        let df = df!["a" => [1.0], "b" => [2.0]].unwrap();
        assert!(require_columns(&df, &["a".to_string(), "b".to_string()]).is_ok());
        assert!(require_columns(&df, &["c".to_string()]).is_err());
    }
}
