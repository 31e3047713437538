//! Reverse geocoding via Nominatim

use serde::{Deserialize, Serialize};

use super::{DataSource, EnrichmentError};

/// Region and city names for a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationData {
    /// Administrative region (province/state)
    pub location: String,
    pub city: String,
}

impl LocationData {
    pub fn fallback() -> Self {
        Self {
            location: "Banda Sea".to_string(),
            city: "Ambon".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    url: String,
    language: String,
    user_agent: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
}

impl Geocoder {
    pub fn new(url: String, language: String, user_agent: String, http: reqwest::Client) -> Self {
        Self { url, language, user_agent, http }
    }

    /// Never fails: any error degrades to [`LocationData::fallback`]
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> (LocationData, DataSource) {
        match self.try_reverse(latitude, longitude).await {
            Ok(place) => {
                tracing::debug!(region = %place.location, city = %place.city, "Location resolved");
                (place, DataSource::Live)
            }
            Err(e) => {
                tracing::warn!(latitude, longitude, "Failed to resolve location: {}", e);
                (LocationData::fallback(), DataSource::Fallback)
            }
        }
    }

    async fn try_reverse(&self, latitude: f64, longitude: f64) -> Result<LocationData, EnrichmentError> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let body = self
            .http
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_reverse(&body)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_reverse(body: &str) -> Result<LocationData, EnrichmentError> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    let address = response.address.ok_or(EnrichmentError::MissingField("address"))?;

    let city = non_empty(address.city)
        .or_else(|| non_empty(address.town))
        .or_else(|| non_empty(address.village))
        .ok_or(EnrichmentError::MissingField("address.city"))?;
    let location = non_empty(address.state).ok_or(EnrichmentError::MissingField("address.state"))?;

    Ok(LocationData { location, city })
}
