//! Scalar feature values

use serde::{Deserialize, Serialize};

/// Sentinel for categorical columns with no usable value
pub const UNKNOWN_CATEGORY: &str = "Tidak Diketahui";

/// A single tabular cell: numeric or categorical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric coercion: numbers pass through, numeric strings are parsed,
    /// anything else (including NaN/inf) becomes 0.0
    pub fn to_number(&self) -> f64 {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if value.is_finite() { value } else { 0.0 }
    }

    /// String coercion; integral numbers render without a fractional part
    pub fn to_category(&self) -> String {
        match self {
            Self::Text(s) if s.trim().is_empty() => UNKNOWN_CATEGORY.to_string(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if !n.is_finite() => UNKNOWN_CATEGORY.to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
