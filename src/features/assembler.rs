//! Feature Assembler
//!
//! Merges the request, the enrichment result and a block of placeholder
//! earthquake features into one row that matches the preprocessor schema
//! exactly: declared order, declared types, nothing extra.

use std::collections::BTreeMap;

use crate::enrichment::Enrichment;
use crate::inference::{tsunami_potential, TsunamiPotential};

use super::row::{ColumnKind, FeatureRow, FeatureSchema};
use super::value::{FeatureValue, UNKNOWN_CATEGORY};

/// Constants standing in for columns the model was trained on but this
/// service does not observe
#[derive(Debug, Clone)]
pub struct PlaceholderFeatures {
    pub magnitude: f64,
    pub mag_type: &'static str,
    pub depth: f64,
    pub phasecount: f64,
    pub azimuth_gap: f64,
    pub agency: &'static str,
    pub potensi_gempa: &'static str,
}

impl Default for PlaceholderFeatures {
    fn default() -> Self {
        Self {
            magnitude: 4.427889833,
            mag_type: "M",
            depth: 28.0,
            phasecount: 65.0,
            azimuth_gap: 136.0,
            agency: "BMKG",
            potensi_gempa: UNKNOWN_CATEGORY,
        }
    }
}

impl PlaceholderFeatures {
    /// Magnitude and depth actually fed to the model
    pub fn resolve(&self, magnitude: Option<f64>, depth: Option<f64>) -> (f64, f64) {
        (magnitude.unwrap_or(self.magnitude), depth.unwrap_or(self.depth))
    }
}

/// Per-request inputs with magnitude and depth already resolved
#[derive(Debug, Clone, Copy)]
pub struct RawInputs<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth: f64,
    /// Computed once; the same value is a feature and part of the response
    pub tsunami: TsunamiPotential,
    pub enrichment: &'a Enrichment,
}

impl<'a> RawInputs<'a> {
    pub fn new(
        latitude: f64,
        longitude: f64,
        magnitude: Option<f64>,
        depth: Option<f64>,
        placeholders: &PlaceholderFeatures,
        enrichment: &'a Enrichment,
    ) -> Self {
        let (magnitude, depth) = placeholders.resolve(magnitude, depth);
        Self {
            latitude,
            longitude,
            magnitude,
            depth,
            tsunami: tsunami_potential(magnitude, depth),
            enrichment,
        }
    }
}

/// Union of every field available for a request.
/// Precedence: request > enrichment > placeholders.
pub fn collect_fields(inputs: &RawInputs<'_>, placeholders: &PlaceholderFeatures) -> BTreeMap<String, FeatureValue> {
    let mut fields = BTreeMap::new();
    let mut put = |name: &str, value: FeatureValue| {
        fields.insert(name.to_string(), value);
    };

    put("mag_type", placeholders.mag_type.into());
    put("phasecount", placeholders.phasecount.into());
    put("azimuth_gap", placeholders.azimuth_gap.into());
    put("agency", placeholders.agency.into());
    put("potensi_gempa", placeholders.potensi_gempa.into());
    put("potensi_tsunami", inputs.tsunami.as_str().into());

    let weather = &inputs.enrichment.weather;
    put("temperature", weather.temperature.into());
    put("humidity", weather.humidity.into());
    put("weather", weather.condition.as_str().into());
    put("weathercode", weather.weathercode.into());
    put("temperature_2m_max", weather.temperature_2m_max.into());
    put("temperature_2m_min", weather.temperature_2m_min.into());
    put("precipitation_sum", weather.precipitation_sum.into());
    put("windspeed_10m_max", weather.windspeed_10m_max.into());

    let place = &inputs.enrichment.location;
    put("location", place.location.as_str().into());
    put("city", place.city.as_str().into());

    put("latitude", inputs.latitude.into());
    put("longitude", inputs.longitude.into());
    put("magnitude", inputs.magnitude.into());
    put("depth", inputs.depth.into());

    fields
}

/// Projects field maps onto the preprocessor's declared schema
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    schema: FeatureSchema,
}

impl FeatureAssembler {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Total and idempotent: every declared column gets a typed value,
    /// undeclared fields are dropped
    pub fn assemble(&self, fields: &BTreeMap<String, FeatureValue>) -> FeatureRow {
        let cells = self
            .schema
            .columns()
            .iter()
            .map(|column| {
                let raw = fields.get(&column.name);
                let value = match column.kind {
                    ColumnKind::Numeric => {
                        FeatureValue::Number(raw.map(FeatureValue::to_number).unwrap_or(0.0))
                    }
                    ColumnKind::Categorical => FeatureValue::Text(
                        raw.map(FeatureValue::to_category)
                            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                    ),
                };
                (column.name.clone(), value)
            })
            .collect();

        let dropped = fields.keys().filter(|k| self.schema.kind_of(k).is_none()).count();
        tracing::debug!(columns = self.schema.len(), dropped, "Assembled feature row");

        FeatureRow::from_cells(cells)
    }
}
