//! waterlog-learning: random forest training for the water-logging classifier.
//!
//! This crate fits a bagged decision-tree ensemble on the feature table
//! produced by `waterlog-processing`, evaluates it on a seeded hold-out,
//! persists every fitted artifact and answers single-record queries.
//!
//! # Features
//!
//! - **Training Pipeline**: impute, encode, scale, split, fit and evaluate in one call
//! - **Random Forest**: Gini trees grown in parallel with `rayon`, reproducible by seed
//! - **Metrics**: accuracy, positive-class precision/recall/F1 and a per-class report
//! - **Artifacts**: classifier, encoders and scaler written as separate `bincode` files
//! - **Report**: held-out rows with class probabilities as `.xlsx` or `.csv`
//! - **Progress Reporting**: stage callbacks during training
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use waterlog_learning::{ArtifactLayout, Pipeline, PipelineConfig};
//! use waterlog_processing::load_dataset;
//!
//! let config = PipelineConfig::default();
//! let df = load_dataset("combined_manual (5).xlsx", "Sheet1", &config.schema)?;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|u| println!("{:.0}% - {}", u.progress * 100.0, u.message))
//!     .build()?;
//!
//! let (result, model) = pipeline.train(&df)?;
//! model.save(&ArtifactLayout::default())?;
//!
//! let prediction = model.predict(&serde_json::json!({
//!     "Water_Table": "High", "urbanization": "Good",
//!     "Elevation": 5, "precipitation": 30,
//!     "runoff_coefficient": 0.6, "drainage": 25
//! }))?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ waterlog-processing                                              │
//! │  load_dataset ──► GroupMeanImputer ──► FeaturePreprocessor       │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ waterlog-learning                                                │
//! │  TrainTestSplit ──► RandomForest ──► evaluate ──► TrainingResult │
//! │                          │                                       │
//! │                          └──► TrainedModel ──► ArtifactStore     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError).
//! Preprocessing failures are wrapped in [`LearningError::Preprocessing`];
//! use [`LearningError::is_unknown_category`] to tell an unseen query value
//! apart from other failures.

mod config;
mod error;
pub mod forest;
pub mod metrics;
mod model;
pub mod persistence;
mod pipeline;
mod progress;
pub mod report;
mod split;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{
    ArtifactLayout, ForestConfig, ForestConfigBuilder, MaxFeatures, PipelineConfig,
    PipelineConfigBuilder,
};
// Error types
pub use error::{LearningError, Result};
// Model types
pub use forest::RandomForest;
pub use model::TrainedModel;
pub use persistence::{ArtifactStore, ModelArtifact};
// Pipeline types
pub use pipeline::{Pipeline, PipelineBuilder};
// Progress reporting types
pub use progress::{ParseTrainingStageError, ProgressCallback, ProgressUpdate, TrainingStage};
// Evaluation
pub use metrics::{ClassificationMetrics, ClassificationReport, ConfusionMatrix, evaluate};
pub use report::{probability_table, write_report};
pub use split::TrainTestSplit;
// Result types
pub use types::{FeatureImportance, ImportanceTable, PredictionResult, TrainingResult};
