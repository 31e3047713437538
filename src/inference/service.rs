//! Inference Service
//!
//! preprocessor transform -> model run -> arg-max -> label decode.
//! Failures never escape `predict`: they come back as the `ERROR` sentinel.

use serde::Serialize;
use std::time::Instant;

use crate::features::{FeatureAssembler, FeatureRow, FeatureSchema, PlaceholderFeatures};

use super::artifacts::{ArtifactInfo, Artifacts};
use super::error::InferenceError;

/// Label used by the failure sentinel
pub const ERROR_LABEL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    /// Probability of `label`, in [0, 1]
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            label: ERROR_LABEL.to_string(),
            confidence: 0.0,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything `/model` reports about the loaded artifacts
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo<'a> {
    pub engine: &'static str,
    pub artifacts: &'a ArtifactInfo,
    pub schema: &'a FeatureSchema,
    pub features: usize,
    pub labels: &'a [String],
}

#[derive(Debug)]
pub struct InferenceService {
    artifacts: Artifacts,
    assembler: FeatureAssembler,
    placeholders: PlaceholderFeatures,
}

impl InferenceService {
    pub fn new(artifacts: Artifacts) -> Self {
        let assembler = FeatureAssembler::new(artifacts.preprocessor.schema().clone());
        Self {
            artifacts,
            assembler,
            placeholders: PlaceholderFeatures::default(),
        }
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn placeholders(&self) -> &PlaceholderFeatures {
        &self.placeholders
    }

    pub fn info(&self) -> ModelInfo<'_> {
        ModelInfo {
            engine: self.artifacts.classifier.name(),
            artifacts: &self.artifacts.info,
            schema: self.assembler.schema(),
            features: self.artifacts.preprocessor.output_width(),
            labels: self.artifacts.labels.classes(),
        }
    }

    pub fn predict(&self, row: &FeatureRow) -> PredictionResult {
        let started = Instant::now();
        match self.try_predict(row) {
            Ok(result) => {
                tracing::debug!(
                    label = %result.label,
                    confidence = result.confidence,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Inference complete"
                );
                result
            }
            Err(e) => {
                tracing::error!("Prediction error: {}", e);
                PredictionResult::failed(e.to_string())
            }
        }
    }

    fn try_predict(&self, row: &FeatureRow) -> Result<PredictionResult, InferenceError> {
        let x = self.artifacts.preprocessor.transform(row)?;
        tracing::debug!(shape = x.len(), "Data shape after preprocessing");

        let scores = self.artifacts.classifier.predict_proba(x.view())?;

        // First maximum wins on ties
        let (index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        let label = self
            .artifacts
            .labels
            .inverse_transform(index)
            .ok_or(InferenceError::UnknownClass(index))?;

        Ok(PredictionResult {
            label: label.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            error: None,
        })
    }
}
