//! Prediction request/response models

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::enrichment::{DataSources, Enrichment, LocationData, WeatherData};
use crate::inference::{PredictionResult, TsunamiPotential};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PredictRequest {
    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(
        required(message = "Missing required fields (latitude, longitude)"),
        range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90")
    )]
    pub latitude: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    #[validate(
        required(message = "Missing required fields (latitude, longitude)"),
        range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180")
    )]
    pub longitude: Option<f64>,

    #[serde(default, alias = "magnitude_aktual", deserialize_with = "lenient_f64")]
    #[validate(range(min = 0.0, max = 10.0, message = "magnitude must be between 0 and 10"))]
    pub magnitude: Option<f64>,

    /// Hypocentre depth in km
    #[serde(default, alias = "kedalaman_aktual", deserialize_with = "lenient_f64")]
    #[validate(range(min = 0.0, max = 1000.0, message = "depth must be between 0 and 1000 km"))]
    pub depth: Option<f64>,
}

/// Accepts JSON numbers and numeric strings; `null` means absent
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => return Err(D::Error::custom(format!("expected a number, got {}", other))),
    };

    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(D::Error::custom("expected a finite number")),
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub request_id: Uuid,
    pub prediksi_risiko: String,
    pub tingkat_keyakinan: f64,
    pub potensi_tsunami: TsunamiPotential,
    #[serde(flatten)]
    pub location: LocationData,
    #[serde(flatten)]
    pub weather: WeatherData,
    pub data_source: DataSources,
}

impl PredictResponse {
    pub fn new(request_id: Uuid, result: PredictionResult, tsunami: TsunamiPotential, enrichment: Enrichment) -> Self {
        Self {
            request_id,
            prediksi_risiko: result.label,
            tingkat_keyakinan: result.confidence,
            potensi_tsunami: tsunami,
            location: enrichment.location,
            weather: enrichment.weather,
            data_source: enrichment.data_source,
        }
    }
}
