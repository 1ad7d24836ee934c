//! Configuration types for training.
//!
//! This module provides:
//! - [`ForestConfig`]: random forest hyperparameters
//! - [`PipelineConfig`]: dataset schema, forest and split settings for a run
//! - [`ArtifactLayout`]: where the trained artifacts are written
//!
//! Every default matches the water-logging training run: 200 trees, depth
//! 10, at least 5 samples to split, at least 4 per leaf, an 80/20 split and
//! seed 42.
//!
//! # Example
//!
//! ```
//! use waterlog_learning::{ForestConfig, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .forest(ForestConfig::builder().n_estimators(50).build().expect("valid forest"))
//!     .test_size(0.25)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use waterlog_processing::DatasetSchema;

/// Number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaxFeatures {
    /// Square root of the feature count, rounded down.
    #[default]
    Sqrt,
    /// Base-2 logarithm of the feature count, rounded down.
    Log2,
    /// A fixed number, capped at the feature count.
    Fixed(usize),
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolve against a concrete feature count. Never below 1.
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(k) => *k,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees (default: 200). Must be at least 1.
    pub n_estimators: usize,

    /// Maximum tree depth (default: 10). `None` grows until another rule stops it.
    pub max_depth: Option<usize>,

    /// Minimum samples a node needs to be split (default: 5). Must be at least 2.
    pub min_samples_split: usize,

    /// Minimum samples in each leaf (default: 4). Must be at least 1.
    pub min_samples_leaf: usize,

    /// Features considered per split (default: square root).
    pub max_features: MaxFeatures,

    /// Whether each tree trains on a bootstrap resample (default: true).
    pub bootstrap: bool,

    /// Base seed; tree `i` uses `random_seed + i` (default: 42).
    pub random_seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 4,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_seed: 42,
        }
    }
}

impl ForestConfig {
    /// Create a new builder for `ForestConfig`.
    #[must_use]
    pub fn builder() -> ForestConfigBuilder {
        ForestConfigBuilder::default()
    }

    /// Check every constraint documented on the fields.
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(LearningError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == MaxFeatures::Fixed(0) {
            return Err(LearningError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ForestConfig`].
#[derive(Debug, Clone, Default)]
pub struct ForestConfigBuilder {
    config: ForestConfig,
}

impl ForestConfigBuilder {
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_depth = depth;
        self
    }

    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.min_samples_split = n;
        self
    }

    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.config.min_samples_leaf = n;
        self
    }

    #[must_use]
    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.config.max_features = max_features;
        self
    }

    #[must_use]
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.config.bootstrap = bootstrap;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Build and validate the forest configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] when a field is out of range.
    pub fn build(self) -> Result<ForestConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration for one training run.
///
/// Use [`PipelineConfig::builder()`] to construct a configuration with the
/// builder pattern.
///
/// # Validation
///
/// The builder validates on [`build()`](PipelineConfigBuilder::build):
/// - `test_size` must be in range `(0.0, 1.0)` (exclusive)
/// - the dataset schema must pass [`DatasetSchema::validate`]
/// - the forest config must pass [`ForestConfig::validate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Column roles of the training table.
    pub schema: DatasetSchema,

    /// Forest hyperparameters.
    pub forest: ForestConfig,

    /// Fraction of rows held out for evaluation (default: 0.2).
    pub test_size: f64,

    /// Seed of the train/test shuffle (default: 42).
    pub split_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema: DatasetSchema::default(),
            forest: ForestConfig::default(),
            test_size: 0.2,
            split_seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for [`PipelineConfig`].
///
/// Created via [`PipelineConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the dataset schema.
    #[must_use]
    pub fn schema(mut self, schema: DatasetSchema) -> Self {
        self.config.schema = schema;
        self
    }

    /// Set the forest hyperparameters.
    #[must_use]
    pub fn forest(mut self, forest: ForestConfig) -> Self {
        self.config.forest = forest;
        self
    }

    /// Set the held-out fraction.
    #[must_use]
    pub fn test_size(mut self, test_size: f64) -> Self {
        self.config.test_size = test_size;
        self
    }

    /// Set the seed of the train/test shuffle only.
    #[must_use]
    pub fn split_seed(mut self, seed: u64) -> Self {
        self.config.split_seed = seed;
        self
    }

    /// Set the split seed and the forest seed together.
    ///
    /// Applies to the forest config held at the time of the call; a later
    /// [`forest()`](Self::forest) replaces it.
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.split_seed = seed;
        self.config.forest.random_seed = seed;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if validation fails.
    pub fn build(self) -> Result<PipelineConfig, LearningError> {
        let config = self.config;

        if !(config.test_size > 0.0 && config.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "test_size must be between 0.0 and 1.0 (exclusive), got {}",
                config.test_size
            )));
        }

        config
            .schema
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;
        config.forest.validate()?;

        Ok(config)
    }
}

/// File names of the persisted artifacts, all under one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    /// Directory holding every artifact (default: current directory).
    pub output_dir: PathBuf,

    /// Classifier artifact (default: `random_forest.bin`).
    pub model_file: String,

    /// Scaler artifact (default: `scaler.bin`).
    pub scaler_file: String,

    /// Appended to the feature name for each encoder artifact
    /// (default: `_label_encoder.bin`).
    pub encoder_suffix: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ArtifactLayout {
    /// Default file names under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            model_file: "random_forest.bin".to_string(),
            scaler_file: "scaler.bin".to_string(),
            encoder_suffix: "_label_encoder.bin".to_string(),
        }
    }

    #[must_use]
    pub fn with_model_file(mut self, name: impl Into<String>) -> Self {
        self.model_file = name.into();
        self
    }

    #[must_use]
    pub fn with_scaler_file(mut self, name: impl Into<String>) -> Self {
        self.scaler_file = name.into();
        self
    }

    #[must_use]
    pub fn with_encoder_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.encoder_suffix = suffix.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(&self.model_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.output_dir.join(&self.scaler_file)
    }

    /// Encoder artifact of one categorical feature.
    pub fn encoder_path(&self, feature: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", feature, self.encoder_suffix))
    }
}
