//! Rule-based tsunami potential, evaluated alongside the model

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TsunamiPotential {
    #[serde(rename = "Tinggi")]
    High,
    #[serde(rename = "Sedang")]
    Medium,
    #[serde(rename = "Rendah")]
    Low,
}

impl TsunamiPotential {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "Tinggi",
            Self::Medium => "Sedang",
            Self::Low => "Rendah",
        }
    }
}

/// High: magnitude > 7 and depth < 30 km. Medium: magnitude > 6. Else Low.
pub fn tsunami_potential(magnitude: f64, depth: f64) -> TsunamiPotential {
    if magnitude > 7.0 && depth < 30.0 {
        TsunamiPotential::High
    } else if magnitude > 6.0 {
        TsunamiPotential::Medium
    } else {
        TsunamiPotential::Low
    }
}
