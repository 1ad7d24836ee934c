//! Trained model for inference and persistence.
//!
//! [`TrainedModel`] pairs the fitted [`RandomForest`] with the
//! [`FeaturePreprocessor`] it was trained behind, so a raw record goes
//! through exactly the encoding and scaling used at fit time.
//!
//! # Lifecycle
//!
//! A `TrainedModel` is created in one of two ways:
//!
//! 1. **From training**: returned by [`Pipeline::train()`](crate::Pipeline::train)
//! 2. **From disk**: [`TrainedModel::load()`] reassembles it from the artifact files
//!
//! # Example
//!
//! ```rust,ignore
//! use waterlog_learning::{ArtifactLayout, TrainedModel};
//!
//! let (result, model) = pipeline.train(&df)?;
//! for path in model.save(&ArtifactLayout::new("artifacts"))? {
//!     println!("Saved {}", path.display());
//! }
//!
//! let loaded = TrainedModel::load("artifacts")?;
//! let prediction = loaded.predict(&serde_json::json!({
//!     "Water_Table": "High", "urbanization": "Good",
//!     "Elevation": 5, "precipitation": 30,
//!     "runoff_coefficient": 0.6, "drainage": 25
//! }))?;
//! ```

use crate::config::ArtifactLayout;
use crate::error::{LearningError, Result};
use crate::forest::RandomForest;
use crate::persistence::{ArtifactStore, ModelArtifact};
use crate::types::{FeatureImportance, PredictionResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use waterlog_processing::FeaturePreprocessor;

/// A trained classifier ready for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    forest: RandomForest,
    preprocessor: FeaturePreprocessor,
    feature_names: Vec<String>,
}

static_assertions::assert_impl_all!(TrainedModel: Send, Sync);

impl TrainedModel {
    /// Pair a fitted forest with its preprocessor.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] if the forest width differs from the
    /// preprocessor's feature count.
    pub fn new(forest: RandomForest, preprocessor: FeaturePreprocessor) -> Result<Self> {
        let feature_names = preprocessor.feature_names();
        if forest.n_features() != feature_names.len() {
            return Err(LearningError::InvalidData(format!(
                "forest expects {} features but the preprocessor produces {}",
                forest.n_features(),
                feature_names.len()
            )));
        }
        Ok(Self {
            forest,
            preprocessor,
            feature_names,
        })
    }

    /// Predict one raw record given as a JSON object.
    ///
    /// # Errors
    ///
    /// - unseen categorical value: [`LearningError::Preprocessing`] with
    ///   [`is_unknown_category()`](LearningError::is_unknown_category) set
    /// - missing field or wrong value type:
    ///   [`is_schema_mismatch()`](LearningError::is_schema_mismatch) set
    pub fn predict(&self, record: &Value) -> Result<PredictionResult> {
        let row = self.preprocessor.transform_record(record)?;
        self.predict_row(&row)
    }

    /// Predict one raw record given as JSON text.
    pub fn predict_json(&self, text: &str) -> Result<PredictionResult> {
        let row = self.preprocessor.transform_json(text)?;
        self.predict_row(&row)
    }

    /// Predict one already-transformed feature row in model order.
    pub fn predict_row(&self, row: &[f64]) -> Result<PredictionResult> {
        let (label, probabilities) = self.forest.predict_row(row)?;
        Ok(PredictionResult::from_votes(label, probabilities))
    }

    /// Feature importances ranked in descending order.
    pub fn feature_importance(&self) -> Vec<FeatureImportance> {
        let mut ranked: Vec<FeatureImportance> = self
            .feature_names
            .iter()
            .zip(self.forest.feature_importances().iter())
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked
    }

    /// Feature names in the order the forest expects.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    /// Write the classifier, every encoder and the scaler.
    ///
    /// Creates the output directory if needed and returns the written paths
    /// in write order.
    pub fn save(&self, layout: &ArtifactLayout) -> Result<Vec<PathBuf>> {
        let store = ArtifactStore::new(layout.clone());
        store.prepare()?;

        let mut written = Vec::new();
        written.push(store.save_model(&ModelArtifact {
            feature_names: self.feature_names.clone(),
            forest: self.forest.clone(),
        })?);
        for encoder in self.preprocessor.encoders() {
            written.push(store.save_encoder(encoder)?);
        }
        written.push(store.save_scaler(self.preprocessor.scaler())?);

        info!(
            "Saved {} artifacts to {}",
            written.len(),
            layout.output_dir().display()
        );
        Ok(written)
    }

    /// Load the artifacts written under `dir` with default file names.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(&ArtifactLayout::new(dir.as_ref()))
    }

    /// Load the artifacts of `layout`.
    ///
    /// The encoders to read are the categorical features recorded in the
    /// classifier artifact, i.e. the leading feature names not handled by
    /// the scaler.
    pub fn load_with(layout: &ArtifactLayout) -> Result<Self> {
        let store = ArtifactStore::new(layout.clone());
        let model = store.load_model()?;
        let scaler = store.load_scaler()?;

        let encoders = model
            .feature_names
            .iter()
            .filter(|name| !scaler.features().contains(name))
            .map(|name| store.load_encoder(name))
            .collect::<Result<Vec<_>>>()?;

        let preprocessor = FeaturePreprocessor::from_parts(encoders, scaler)?;
        if preprocessor.feature_names() != model.feature_names {
            return Err(LearningError::Serialization(format!(
                "artifact feature order {:?} does not match the transformers {:?}",
                model.feature_names,
                preprocessor.feature_names()
            )));
        }

        info!("Loaded model from {}", layout.output_dir().display());
        Self::new(model.forest, preprocessor)
    }
}
