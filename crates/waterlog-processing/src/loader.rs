//! Dataset loading.
//!
//! Reads the training table from a spreadsheet workbook (one named sheet) or
//! from a CSV file, then normalizes column types against a [`DatasetSchema`]:
//! the grouping key and categorical features become strings, numeric features
//! and the target become `Float64`. Columns outside the schema are dropped.

use crate::config::DatasetSchema;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::utils::{f64_values, require_columns, string_values};
use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Workbook extensions handled by the spreadsheet reader.
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load the raw table, dispatching on the file extension.
///
/// `sheet` is only consulted for workbooks.
pub fn load_table(path: impl AsRef<Path>, sheet: &str) -> Result<DataFrame> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let df = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        read_workbook(path, sheet)?
    } else if extension == "csv" {
        read_csv(path)?
    } else {
        return Err(PreprocessingError::UnsupportedFormat(path.display().to_string()));
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Load the table and normalize it against the schema.
pub fn load_dataset(path: impl AsRef<Path>, sheet: &str, schema: &DatasetSchema) -> Result<DataFrame> {
    let raw = load_table(path, sheet)?;
    normalize_columns(&raw, schema)
}

/// Read one sheet of a workbook into a DataFrame.
///
/// The first row holds the column names. A column whose non-empty cells are
/// all numbers becomes `Float64`; any other column becomes `String`. Empty
/// cells are nulls.
pub fn read_workbook(path: &Path, sheet: &str) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range(sheet)?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell {
                Data::Empty => format!("column_{}", idx),
                Data::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
        None => {
            return Err(PreprocessingError::NoValidValues(format!("sheet '{}'", sheet)));
        }
    };
    let body: Vec<&[Data]> = rows.collect();
    debug!("Sheet '{}' has {} data rows", sheet, body.len());

    let mut columns = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Data::Empty))
            .collect();
        columns.push(cells_to_column(name, &cells));
    }

    DataFrame::new(columns).context(format!("Building table from sheet '{}'", sheet))
}

fn cells_to_column(name: &str, cells: &[&Data]) -> Column {
    let numeric = cells
        .iter()
        .all(|cell| matches!(cell, Data::Int(_) | Data::Float(_) | Data::Empty));

    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Int(v) => Some(*v as f64),
                Data::Float(v) => Some(*v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values).into_column()
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Empty => None,
                Data::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), values).into_column()
    }
}

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .context(format!("Reading CSV file {}", path.display()))
}

/// Keep the schema's columns and coerce them to their working types.
///
/// Text columns are trimmed, matching the workbook reader and record lookups.
pub fn normalize_columns(df: &DataFrame, schema: &DatasetSchema) -> Result<DataFrame> {
    let required = schema.required_columns();
    require_columns(df, &required)?;

    let mut columns = Vec::with_capacity(required.len());
    for name in &required {
        let is_text = name == &schema.group_column || schema.categorical_features.contains(name);
        let column = if is_text {
            let values: Vec<Option<String>> = string_values(df, name)?
                .into_iter()
                .map(|value| value.map(|s| s.trim().to_string()))
                .collect();
            Series::new(name.as_str().into(), values).into_column()
        } else {
            Series::new(name.as_str().into(), f64_values(df, name)?).into_column()
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}
