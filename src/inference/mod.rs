//! Inference Module - fitted artifacts and the prediction pipeline
//!
//! - `model.onnx`: trained classifier, run through ONNX Runtime
//! - `preprocessor.json`: `feature_names_in` + ordered column transformers
//! - `label_encoder.json`: `classes`

pub mod error;
pub mod artifacts;
pub mod engine;
pub mod preprocessor;
pub mod labels;
pub mod service;
pub mod tsunami;

// Re-export common types
pub use artifacts::{ArtifactPaths, Artifacts};
pub use service::{InferenceService, PredictionResult};
pub use tsunami::{tsunami_potential, TsunamiPotential};

#[cfg(test)]
pub(crate) mod fixtures {
    use ndarray::{array, Array1, Array2, ArrayView1};

    use super::*;
    use super::artifacts::ArtifactInfo;
    use super::engine::InferenceEngine;
    use super::error::InferenceError;
    use super::labels::LabelEncoder;
    use super::preprocessor::Preprocessor;

    pub const PREPROCESSOR_JSON: &str = r#"{
        "feature_names_in": [
            "latitude", "longitude", "temperature_2m_max", "precipitation_sum",
            "magnitude", "depth", "city", "potensi_tsunami", "agency"
        ],
        "transformers": [
            {
                "kind": "standard_scaler",
                "columns": ["latitude", "longitude", "temperature_2m_max", "precipitation_sum", "magnitude", "depth"],
                "mean": [-2.0, 120.0, 28.0, 10.0, 5.0, 30.0],
                "scale": [5.0, 10.0, 3.0, 10.0, 1.0, 20.0]
            },
            {
                "kind": "one_hot",
                "columns": ["city", "potensi_tsunami"],
                "categories": [["Ambon", "Jakarta"], ["Rendah", "Sedang", "Tinggi"]]
            }
        ]
    }"#;

    pub const LABELS_JSON: &str = r#"{"classes": ["Rendah", "Sedang", "Tinggi"]}"#;

    /// Softmax regression standing in for the ONNX session
    #[derive(Debug)]
    pub struct LinearEngine {
        /// `[classes][features]`
        pub weights: Array2<f64>,
        pub bias: Array1<f64>,
    }

    impl LinearEngine {
        /// Scaled magnitude (column 4) pushes Rendah down and Tinggi up;
        /// the `potensi_tsunami=Tinggi` one-hot (column 10) adds to Tinggi
        pub fn sample() -> Self {
            let mut weights = Array2::zeros((3, 11));
            weights[[0, 4]] = -2.0;
            weights[[2, 4]] = 2.0;
            weights[[2, 10]] = 2.0;
            Self { weights, bias: array![0.0, 0.5, 0.0] }
        }
    }

    impl InferenceEngine for LinearEngine {
        fn name(&self) -> &'static str {
            "linear"
        }

        fn input_width(&self) -> usize {
            self.weights.ncols()
        }

        fn output_width(&self) -> usize {
            self.weights.nrows()
        }

        fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<Array1<f64>, InferenceError> {
            if features.len() != self.input_width() {
                return Err(InferenceError::Shape { expected: self.input_width(), got: features.len() });
            }
            let logits = self.weights.dot(&features) + &self.bias;
            let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let exp = logits.mapv(|v| (v - max).exp());
            let sum = exp.sum();
            Ok(exp / sum)
        }
    }

    pub fn artifacts_with(preprocessor: &str, labels: &str) -> Artifacts {
        let preprocessor = Preprocessor::from_spec(serde_json::from_str(preprocessor).unwrap()).unwrap();
        let labels: LabelEncoder = serde_json::from_str(labels).unwrap();
        let info = ArtifactInfo { files: Vec::new(), loaded_at: chrono::Utc::now() };
        Artifacts::from_parts(Box::new(LinearEngine::sample()), preprocessor, labels.validated().unwrap(), info).unwrap()
    }

    pub fn sample_artifacts() -> Artifacts {
        artifacts_with(PREPROCESSOR_JSON, LABELS_JSON)
    }

    pub fn sample_service() -> InferenceService {
        InferenceService::new(sample_artifacts())
    }
}
