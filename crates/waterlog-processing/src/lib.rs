//! Data preparation for the water-logging classifier.
//!
//! Built on Polars, this crate turns a raw flood/runoff table into the
//! numeric feature table the model is trained on, and keeps the fitted state
//! needed to push a single query record through the exact same transform.
//!
//! # Overview
//!
//! - **Loading**: spreadsheet workbooks (via `calamine`) or CSV files, with
//!   column types normalized against a [`DatasetSchema`]
//! - **Imputation**: group-wise mean replacement of a sentinel marker
//!   ([`GroupMeanImputer`])
//! - **Encoding**: sorted, fit-once label encoding ([`LabelEncoder`])
//! - **Scaling**: population standardization ([`StandardScaler`])
//! - **Query transform**: [`FeaturePreprocessor::transform_record`] maps one
//!   JSON record to a feature row in model order
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use waterlog_processing::{DatasetSchema, FeaturePreprocessor, GroupMeanImputer, load_dataset};
//!
//! let schema = DatasetSchema::default();
//! let mut df = load_dataset("combined_manual (5).xlsx", "Sheet1", &schema)?;
//!
//! let summary = GroupMeanImputer::from_schema(&schema).impute(&mut df)?;
//! println!("{}", summary.describe());
//!
//! let (preprocessor, features) = FeaturePreprocessor::fit_transform(&df, &schema)?;
//! let row = preprocessor.transform_record(&serde_json::json!({
//!     "Water_Table": "High", "urbanization": "Good",
//!     "Elevation": 5, "precipitation": 30,
//!     "runoff_coefficient": 0.6, "drainage": 25
//! }))?;
//! ```

pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod preprocessor;
pub mod transformers;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, DEFAULT_SENTINEL, DatasetSchema, DatasetSchemaBuilder};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{GroupMeanImputer, ImputationSummary};
pub use loader::{load_dataset, load_table, normalize_columns};
pub use preprocessor::FeaturePreprocessor;
pub use transformers::{LabelEncoder, StandardScaler};
pub use utils::{f64_values, format_number, string_values};
