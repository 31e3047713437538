//! Inference and artifact errors

use std::path::PathBuf;

/// Fatal at startup: the service never runs with partial artifacts
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("artifacts are inconsistent: {0}")]
    Mismatch(String),
}

/// Per-request failure inside transform or model run
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("feature columns [{got}] do not match expected [{expected}]")]
    ColumnMismatch { expected: String, got: String },

    #[error("column `{column}` must be a {expected}")]
    TypeMismatch { column: String, expected: &'static str },

    #[error("unknown category `{value}` in column `{column}`")]
    UnknownCategory { column: String, value: String },

    #[error("input has {got} features, model expects {expected}")]
    Shape { expected: usize, got: usize },

    #[error("model runtime error: {0}")]
    Runtime(String),

    #[error("model produced a non-finite output")]
    NonFinite,

    #[error("class index {0} has no label")]
    UnknownClass(usize),
}
