//! Enrichment Module - weather and place-name context for a coordinate pair
//!
//! Every lookup is best effort: one outbound call bounded by the client
//! timeout, static fallback values on any failure. The provenance of each
//! half is reported through [`DataSources`].

pub mod weather;
pub mod geocode;

use serde::Serialize;

use crate::config::{Config, WeatherProviderKind};

pub use weather::{WeatherClient, WeatherData, WeatherProvider};
pub use geocode::{Geocoder, LocationData};

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing field `{0}` in response")]
    MissingField(&'static str),
}

/// Where an enrichment value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSources {
    pub weather: DataSource,
    pub location: DataSource,
}

/// Weather + location context, always fully populated
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub weather: WeatherData,
    pub location: LocationData,
    pub data_source: DataSources,
}

impl Enrichment {
    pub fn fallback() -> Self {
        Self {
            weather: WeatherData::fallback(),
            location: LocationData::fallback(),
            data_source: DataSources {
                weather: DataSource::Fallback,
                location: DataSource::Fallback,
            },
        }
    }
}

/// Runs the weather and geocoding lookups for a request
#[derive(Debug, Clone)]
pub struct Enricher {
    weather: WeatherClient,
    geocoder: Geocoder,
}

impl Enricher {
    pub fn new(weather: WeatherClient, geocoder: Geocoder) -> Self {
        Self { weather, geocoder }
    }

    /// Build both clients from configuration, sharing one HTTP pool
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.enrichment_timeout)
            .build()?;

        let provider = match &config.weather_provider {
            WeatherProviderKind::OpenMeteo => WeatherProvider::OpenMeteo {
                url: config.open_meteo_url.clone(),
            },
            WeatherProviderKind::OpenWeatherMap { api_key } => WeatherProvider::OpenWeatherMap {
                url: config.openweathermap_url.clone(),
                api_key: api_key.clone(),
            },
        };

        tracing::info!(
            provider = provider.name(),
            timeout_secs = config.enrichment_timeout.as_secs(),
            "Enrichment clients ready"
        );

        Ok(Self::new(
            WeatherClient::new(provider, http.clone()),
            Geocoder::new(
                config.nominatim_url.clone(),
                config.geocoder_language.clone(),
                config.geocoder_user_agent.clone(),
                http,
            ),
        ))
    }

    pub fn weather_provider(&self) -> &'static str {
        self.weather.provider().name()
    }

    /// Both lookups run concurrently; neither can fail
    pub async fn enrich(&self, latitude: f64, longitude: f64) -> Enrichment {
        let ((weather, weather_source), (location, location_source)) = tokio::join!(
            self.weather.fetch(latitude, longitude),
            self.geocoder.reverse(latitude, longitude),
        );

        Enrichment {
            weather,
            location,
            data_source: DataSources {
                weather: weather_source,
                location: location_source,
            },
        }
    }
}
