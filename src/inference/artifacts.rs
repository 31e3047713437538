//! Artifact Loader
//!
//! Loads the classifier, preprocessor and label encoder once at startup.
//! Any missing, unreadable or inconsistent artifact is fatal.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::config::Config;

use super::engine::{InferenceEngine, OnnxClassifier};
use super::error::ArtifactError;
use super::labels::LabelEncoder;
use super::preprocessor::{Preprocessor, PreprocessorSpec};

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub preprocessor: PathBuf,
    pub label_encoder: PathBuf,
}

impl ArtifactPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model_path.clone(),
            preprocessor: config.preprocessor_path.clone(),
            label_encoder: config.label_encoder_path.clone(),
        }
    }
}

/// Fingerprint of one loaded file
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFile {
    pub role: &'static str,
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub files: Vec<ArtifactFile>,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable after load; shared read-only by every request
#[derive(Debug)]
pub struct Artifacts {
    pub classifier: Box<dyn InferenceEngine>,
    pub preprocessor: Preprocessor,
    pub labels: LabelEncoder,
    pub info: ArtifactInfo,
}

impl Artifacts {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let (pre_spec, pre_file) = read_json::<PreprocessorSpec>("preprocessor", &paths.preprocessor)?;
        let (labels, labels_file) = read_json::<LabelEncoder>("label_encoder", &paths.label_encoder)?;

        let invalid = |path: &Path| {
            let path = path.to_path_buf();
            move |reason: String| ArtifactError::Invalid { path, reason }
        };

        let preprocessor = Preprocessor::from_spec(pre_spec).map_err(invalid(paths.preprocessor.as_path()))?;
        let labels = labels.validated().map_err(invalid(paths.label_encoder.as_path()))?;

        let (_, model_file) = read_file("model", &paths.model)?;
        let classifier = OnnxClassifier::load(&paths.model).map_err(invalid(paths.model.as_path()))?;

        let info = ArtifactInfo {
            files: vec![model_file, pre_file, labels_file],
            loaded_at: Utc::now(),
        };

        let artifacts = Self::from_parts(Box::new(classifier), preprocessor, labels, info)?;

        tracing::info!(
            columns = artifacts.preprocessor.schema().len(),
            features = artifacts.preprocessor.output_width(),
            classes = ?artifacts.labels.classes(),
            "Model, preprocessor, and label encoder loaded successfully"
        );

        Ok(artifacts)
    }

    /// Cross-check the three artifacts against each other
    pub fn from_parts(
        classifier: Box<dyn InferenceEngine>,
        preprocessor: Preprocessor,
        labels: LabelEncoder,
        info: ArtifactInfo,
    ) -> Result<Self, ArtifactError> {
        if preprocessor.output_width() != classifier.input_width() {
            return Err(ArtifactError::Mismatch(format!(
                "preprocessor produces {} features but the model expects {}",
                preprocessor.output_width(),
                classifier.input_width()
            )));
        }
        if classifier.output_width() != labels.len() {
            return Err(ArtifactError::Mismatch(format!(
                "model has {} outputs but the label encoder has {} classes",
                classifier.output_width(),
                labels.len()
            )));
        }

        Ok(Self { classifier, preprocessor, labels, info })
    }
}

fn read_file(role: &'static str, path: &Path) -> Result<(Vec<u8>, ArtifactFile), ArtifactError> {
    tracing::info!("Loading {} from {}", role, path.display());

    if !path.exists() {
        tracing::error!("File not found: {}", path.display());
        return Err(ArtifactError::NotFound { path: path.to_path_buf() });
    }

    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file = ArtifactFile {
        role,
        path: path.display().to_string(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        bytes: bytes.len(),
    };

    Ok((bytes, file))
}

fn read_json<T: DeserializeOwned>(role: &'static str, path: &Path) -> Result<(T, ArtifactFile), ArtifactError> {
    let (bytes, file) = read_file(role, path)?;
    let value = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((value, file))
}
