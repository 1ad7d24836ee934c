//! Artifact files.
//!
//! The classifier, each label encoder and the scaler are written to their
//! own file with `bincode`. Files are created once after training and read
//! back verbatim for inference; there is no versioning or integrity check.

use crate::config::ArtifactLayout;
use crate::error::{LearningError, Result};
use crate::forest::RandomForest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use waterlog_processing::{LabelEncoder, StandardScaler};

/// Classifier artifact: the forest plus the feature order it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub forest: RandomForest,
}

/// Serialize `value` to `path`, replacing any existing file.
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    debug!("Wrote artifact {}", path.display());
    Ok(())
}

/// Deserialize an artifact written by [`write_artifact`].
///
/// # Errors
///
/// [`LearningError::ModelNotFound`] if the file does not exist,
/// [`LearningError::Serialization`] if it cannot be decoded.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(LearningError::ModelNotFound {
            path: path.display().to_string(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    bincode::deserialize_from(reader).map_err(|e| {
        LearningError::Serialization(format!("{}: {}", path.display(), e))
    })
}

/// Reads and writes the artifacts of one [`ArtifactLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    layout: ArtifactLayout,
}

impl ArtifactStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Create the output directory if needed.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(self.layout.output_dir())?;
        Ok(())
    }

    pub fn save_model(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let path = self.layout.model_path();
        write_artifact(&path, artifact)?;
        Ok(path)
    }

    pub fn load_model(&self) -> Result<ModelArtifact> {
        read_artifact(&self.layout.model_path())
    }

    pub fn save_encoder(&self, encoder: &LabelEncoder) -> Result<PathBuf> {
        let path = self.layout.encoder_path(encoder.feature());
        write_artifact(&path, encoder)?;
        Ok(path)
    }

    /// Load the encoder fitted on `feature`.
    pub fn load_encoder(&self, feature: &str) -> Result<LabelEncoder> {
        let encoder: LabelEncoder = read_artifact(&self.layout.encoder_path(feature))?;
        if encoder.feature() != feature {
            return Err(LearningError::Serialization(format!(
                "encoder artifact for '{}' holds feature '{}'",
                feature,
                encoder.feature()
            )));
        }
        Ok(encoder)
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<PathBuf> {
        let path = self.layout.scaler_path();
        write_artifact(&path, scaler)?;
        Ok(path)
    }

    pub fn load_scaler(&self) -> Result<StandardScaler> {
        read_artifact(&self.layout.scaler_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use polars::prelude::*;

    fn encoder() -> LabelEncoder {
        let df = df!["Water_Table" => ["Low", "High"]].unwrap();
        LabelEncoder::fit(&df, "Water_Table").unwrap()
    }

    #[test]
    fn test_encoder_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(ArtifactLayout::new(dir.path()));

        let path = store.save_encoder(&encoder()).unwrap();
        assert!(path.ends_with("Water_Table_label_encoder.bin"));
        assert_eq!(store.load_encoder("Water_Table").unwrap(), encoder());
    }

    #[test]
    fn test_missing_artifact_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(ArtifactLayout::new(dir.path()));

        let err = store.load_scaler().unwrap_err();
        assert!(matches!(err, LearningError::ModelNotFound { .. }));
    }

    #[test]
    fn test_corrupt_artifact_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        std::fs::write(layout.scaler_path(), b"not bincode").unwrap();

        let err = ArtifactStore::new(layout).load_scaler().unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_prepare_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artifacts").join("run1");
        let store = ArtifactStore::new(ArtifactLayout::new(&nested));

        store.prepare().unwrap();
        assert!(nested.is_dir());
    }
}
