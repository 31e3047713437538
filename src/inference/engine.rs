//! Inference Engine - ONNX Runtime integration
//!
//! The classifier is an ONNX export of the trained network (e.g. Keras via
//! tf2onnx). It takes one `[1, n]` f32 row and yields per-class
//! probabilities on its first output.

use ndarray::{Array1, Array2, ArrayView1};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use std::path::Path;

use super::error::InferenceError;

/// Anything that maps a preprocessed row to class probabilities
pub trait InferenceEngine: Send + Sync + std::fmt::Debug {
    /// Runtime name reported by `/model`
    fn name(&self) -> &'static str;
    fn input_width(&self) -> usize;
    fn output_width(&self) -> usize;
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<Array1<f64>, InferenceError>;
}

/// ONNX classifier session
pub struct OnnxClassifier {
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
    output_name: String,
    input_width: usize,
    output_width: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("output_name", &self.output_name)
            .field("input_width", &self.input_width)
            .field("output_width", &self.output_width)
            .finish()
    }
}

/// Static size of the last axis, e.g. `[-1, 11]` -> 11
fn last_dim(shape: Option<&[i64]>, what: &str) -> Result<usize, String> {
    match shape.and_then(|s| s.last().copied()) {
        Some(n) if n > 0 => Ok(n as usize),
        Some(_) => Err(format!("{} width must be static", what)),
        None => Err(format!("{} is not a tensor", what)),
    }
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, String> {
        let session = Session::builder()
            .map_err(|e| format!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| format!("Failed to set optimization: {}", e))?
            .commit_from_file(path)
            .map_err(|e| format!("Failed to load model: {}", e))?;

        let input = session.inputs.first().ok_or("model defines no input")?;
        let input_width = last_dim(input.input_type.tensor_shape().map(|s| &s[..]), "model input")?;

        let output = session.outputs.first().ok_or("model defines no output")?;
        let output_width = last_dim(output.output_type.tensor_shape().map(|s| &s[..]), "model output")?;
        let output_name = output.name.clone();

        tracing::info!(input = %input.name, output = %output_name, input_width, output_width, "ONNX model loaded");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            input_width,
            output_width,
        })
    }
}

impl InferenceEngine for OnnxClassifier {
    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        if features.len() != self.input_width {
            return Err(InferenceError::Shape {
                expected: self.input_width,
                got: features.len(),
            });
        }

        let input_array = Array2::<f32>::from_shape_vec(
            (1, self.input_width),
            features.iter().map(|v| *v as f32).collect(),
        )
        .map_err(|e| InferenceError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::Runtime("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;

        if data.len() != self.output_width {
            return Err(InferenceError::Runtime(format!(
                "model returned {} scores, expected {}",
                data.len(),
                self.output_width
            )));
        }

        let probs: Array1<f64> = data.iter().map(|v| f64::from(*v)).collect();
        if probs.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite);
        }
        Ok(probs)
    }
}
