//! Test-probability report.
//!
//! After evaluation the held-out rows are written out with their true label
//! and the forest's class probabilities. The file format follows the
//! extension: `.csv` goes through the polars CSV writer, anything else is
//! written as an `.xlsx` workbook with a single sheet.

use crate::error::{LearningError, Result};
use ndarray::Array2;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use waterlog_processing::utils::is_numeric_dtype;

/// Column holding the true label.
pub const ACTUAL_COLUMN: &str = "Actual";

/// Prefix of the per-class probability columns.
pub const PROBABILITY_PREFIX: &str = "Probability_Class_";

/// Append `Actual` and one `Probability_Class_<k>` column per class to the
/// held-out feature rows.
pub fn probability_table(
    test_features: &DataFrame,
    actual: &[usize],
    proba: &Array2<f64>,
) -> Result<DataFrame> {
    let n_rows = test_features.height();
    if actual.len() != n_rows || proba.nrows() != n_rows {
        return Err(LearningError::InvalidData(format!(
            "report rows disagree: {} feature rows, {} labels, {} probability rows",
            n_rows,
            actual.len(),
            proba.nrows()
        )));
    }

    let mut table = test_features.clone();
    let labels: Vec<i64> = actual.iter().map(|&label| label as i64).collect();
    table.with_column(Series::new(ACTUAL_COLUMN.into(), labels))?;

    for (class, column) in proba.columns().into_iter().enumerate() {
        let name = format!("{}{}", PROBABILITY_PREFIX, class);
        table.with_column(Series::new(name.as_str().into(), column.to_vec()))?;
    }
    Ok(table)
}

/// Write `table` to `path`, choosing CSV or XLSX by extension.
pub fn write_report(table: &DataFrame, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        write_csv(table, path)?;
    } else {
        write_xlsx(table, path)?;
    }

    info!("Wrote {} report rows to {}", table.height(), path.display());
    Ok(path.to_path_buf())
}

fn write_csv(table: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut table = table.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut table)?;
    Ok(())
}

fn write_xlsx(table: &DataFrame, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (col_idx, column) in table.get_columns().iter().enumerate() {
        let col = u16::try_from(col_idx).map_err(|_| {
            LearningError::InvalidData(format!("too many report columns: {}", table.width()))
        })?;
        sheet.write_string_with_format(0, col, column.name().as_str(), &header)?;

        let series = column.as_materialized_series();
        if is_numeric_dtype(series.dtype()) {
            let values = series.cast(&DataType::Float64)?;
            for (row, value) in values.f64()?.into_iter().enumerate() {
                if let Some(value) = value {
                    sheet.write_number(row as u32 + 1, col, value)?;
                }
            }
        } else {
            let values = series.cast(&DataType::String)?;
            for (row, value) in values.str()?.into_iter().enumerate() {
                if let Some(value) = value {
                    sheet.write_string(row as u32 + 1, col, value)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn features() -> DataFrame {
        df![
            "Water_Table" => [0i64, 1],
            "precipitation" => [-1.0, 1.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_probability_table_columns() {
        let proba = array![[0.8, 0.2], [0.25, 0.75]];
        let table = probability_table(&features(), &[0, 1], &proba).unwrap();

        let names: Vec<&str> = table.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Water_Table",
                "precipitation",
                "Actual",
                "Probability_Class_0",
                "Probability_Class_1"
            ]
        );
        let p1: Vec<Option<f64>> = table
            .column("Probability_Class_1")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(p1, vec![Some(0.2), Some(0.75)]);
    }

    #[test]
    fn test_probability_table_rejects_row_mismatch() {
        let proba = array![[0.5, 0.5]];
        let err = probability_table(&features(), &[0, 1], &proba).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_write_csv_report() {
        let dir = tempfile::tempdir().unwrap();
        let proba = array![[0.8, 0.2], [0.25, 0.75]];
        let table = probability_table(&features(), &[0, 1], &proba).unwrap();

        let path = write_report(&table, dir.path().join("probs.csv")).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "Water_Table,precipitation,Actual,Probability_Class_0,Probability_Class_1"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_xlsx_report() {
        let dir = tempfile::tempdir().unwrap();
        let proba = array![[0.8, 0.2], [0.25, 0.75]];
        let table = probability_table(&features(), &[0, 1], &proba).unwrap();

        let path = write_report(&table, dir.path().join("nested").join("probs.xlsx")).unwrap();
        let bytes = std::fs::read(path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
