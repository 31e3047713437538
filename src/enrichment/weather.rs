//! Weather enrichment
//!
//! Two interchangeable providers:
//! - Open-Meteo daily forecast + current conditions (no API key)
//! - OpenWeatherMap current weather (requires API key)
//!
//! Both report in the OpenWeatherMap condition vocabulary (`Clear`/800, ...)
//! so the model always sees the same feature semantics.

use serde::{Deserialize, Serialize};

use super::{DataSource, EnrichmentError};

/// Weather attributes fed to the model. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherData {
    /// Current temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Condition group, e.g. "Clear", "Rain"
    #[serde(rename = "weather")]
    pub condition: String,
    /// OpenWeatherMap condition code
    pub weathercode: i32,
    pub temperature_2m_max: f64,
    pub temperature_2m_min: f64,
    /// Daily precipitation (mm)
    pub precipitation_sum: f64,
    /// Max wind speed at 10 m (km/h)
    pub windspeed_10m_max: f64,
}

impl WeatherData {
    /// Static values used whenever the live lookup fails
    pub fn fallback() -> Self {
        Self {
            temperature: 25.0,
            humidity: 70.0,
            condition: "Clear".to_string(),
            weathercode: 800,
            temperature_2m_max: 29.5,
            temperature_2m_min: 25.3,
            precipitation_sum: 17.9,
            windspeed_10m_max: 21.7,
        }
    }
}

/// Provider selection plus its endpoint
#[derive(Debug, Clone)]
pub enum WeatherProvider {
    OpenMeteo { url: String },
    OpenWeatherMap { url: String, api_key: String },
}

impl WeatherProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenMeteo { .. } => "open-meteo",
            Self::OpenWeatherMap { .. } => "openweathermap",
        }
    }
}

/// Weather lookup client
#[derive(Debug, Clone)]
pub struct WeatherClient {
    provider: WeatherProvider,
    http: reqwest::Client,
}

impl WeatherClient {
    pub fn new(provider: WeatherProvider, http: reqwest::Client) -> Self {
        Self { provider, http }
    }

    pub fn provider(&self) -> &WeatherProvider {
        &self.provider
    }

    /// Never fails: any error degrades to [`WeatherData::fallback`]
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> (WeatherData, DataSource) {
        match self.try_fetch(latitude, longitude).await {
            Ok(weather) => {
                tracing::debug!(provider = self.provider.name(), ?weather, "Weather data retrieved");
                (weather, DataSource::Live)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    latitude,
                    longitude,
                    "Failed to fetch weather data: {}. Using default values.",
                    e
                );
                (WeatherData::fallback(), DataSource::Fallback)
            }
        }
    }

    async fn try_fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherData, EnrichmentError> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let request = match &self.provider {
            WeatherProvider::OpenMeteo { url } => self.http.get(url).query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("daily", "temperature_2m_max,temperature_2m_min,precipitation_sum,windspeed_10m_max"),
                ("current", "temperature_2m,relative_humidity_2m,weather_code"),
                ("timezone", "auto"),
            ]),
            WeatherProvider::OpenWeatherMap { url, api_key } => self.http.get(url).query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", api_key.as_str()),
                ("units", "metric"),
            ]),
        };

        let body = request.send().await?.error_for_status()?.text().await?;

        match &self.provider {
            WeatherProvider::OpenMeteo { .. } => parse_open_meteo(&body),
            WeatherProvider::OpenWeatherMap { .. } => parse_openweathermap(&body),
        }
    }
}

// ============================================================================
// OPEN-METEO
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    daily: OpenMeteoDaily,
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    windspeed_10m_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    weather_code: Option<i32>,
}

fn first_day(series: &[Option<f64>], field: &'static str) -> Result<f64, EnrichmentError> {
    series.first().copied().flatten().ok_or(EnrichmentError::MissingField(field))
}

pub(crate) fn parse_open_meteo(body: &str) -> Result<WeatherData, EnrichmentError> {
    let data: OpenMeteoResponse = serde_json::from_str(body)?;
    let code = data.current.weather_code.ok_or(EnrichmentError::MissingField("current.weather_code"))?;
    let (condition, weathercode) = wmo_condition(code).ok_or(EnrichmentError::MissingField("current.weather_code"))?;

    Ok(WeatherData {
        temperature: data.current.temperature_2m.ok_or(EnrichmentError::MissingField("current.temperature_2m"))?,
        humidity: data
            .current
            .relative_humidity_2m
            .ok_or(EnrichmentError::MissingField("current.relative_humidity_2m"))?,
        condition: condition.to_string(),
        weathercode,
        temperature_2m_max: first_day(&data.daily.temperature_2m_max, "daily.temperature_2m_max")?,
        temperature_2m_min: first_day(&data.daily.temperature_2m_min, "daily.temperature_2m_min")?,
        precipitation_sum: first_day(&data.daily.precipitation_sum, "daily.precipitation_sum")?,
        windspeed_10m_max: first_day(&data.daily.windspeed_10m_max, "daily.windspeed_10m_max")?,
    })
}

/// WMO weather interpretation code -> OpenWeatherMap condition group and id
pub fn wmo_condition(code: i32) -> Option<(&'static str, i32)> {
    let mapped = match code {
        0 => ("Clear", 800),
        1 => ("Clouds", 801),
        2 => ("Clouds", 802),
        3 => ("Clouds", 804),
        45 | 48 => ("Fog", 741),
        51 | 53 | 55 => ("Drizzle", 301),
        56 | 57 => ("Drizzle", 311),
        61 => ("Rain", 500),
        63 => ("Rain", 501),
        65 => ("Rain", 502),
        66 | 67 => ("Rain", 511),
        71 | 77 => ("Snow", 600),
        73 => ("Snow", 601),
        75 => ("Snow", 602),
        80 => ("Rain", 520),
        81 => ("Rain", 521),
        82 => ("Rain", 522),
        85 | 86 => ("Snow", 621),
        95 => ("Thunderstorm", 211),
        96 | 99 => ("Thunderstorm", 202),
        _ => return None,
    };
    Some(mapped)
}

// ============================================================================
// OPENWEATHERMAP
// ============================================================================

#[derive(Debug, Deserialize)]
struct OwmResponse {
    weather: Vec<OwmCondition>,
    main: OwmMain,
    wind: OwmWind,
    #[serde(default)]
    rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: i32,
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    /// m/s with `units=metric`
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

const MS_TO_KMH: f64 = 3.6;

pub(crate) fn parse_openweathermap(body: &str) -> Result<WeatherData, EnrichmentError> {
    let data: OwmResponse = serde_json::from_str(body)?;
    let condition = data.weather.into_iter().next().ok_or(EnrichmentError::MissingField("weather[0]"))?;

    Ok(WeatherData {
        temperature: data.main.temp,
        humidity: data.main.humidity,
        condition: condition.main,
        weathercode: condition.id,
        temperature_2m_max: data.main.temp_max,
        temperature_2m_min: data.main.temp_min,
        precipitation_sum: data.rain.map(|r| r.one_hour).unwrap_or(0.0),
        windspeed_10m_max: data.wind.speed * MS_TO_KMH,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const OPEN_METEO_BODY: &str = r#"{
        "latitude": -3.7, "longitude": 128.2,
        "current": {"time": "2024-05-01T10:00", "temperature_2m": 27.4, "relative_humidity_2m": 83, "weather_code": 61},
        "daily": {
            "time": ["2024-05-01", "2024-05-02"],
            "temperature_2m_max": [30.1, 29.0],
            "temperature_2m_min": [24.2, 24.0],
            "precipitation_sum": [12.5, 3.0],
            "windspeed_10m_max": [18.4, 10.0]
        }
    }"#;

    pub const OWM_BODY: &str = r#"{
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
        "main": {"temp": 28.0, "feels_like": 31.0, "temp_min": 27.0, "temp_max": 29.5, "humidity": 74},
        "wind": {"speed": 5.0, "deg": 120},
        "name": "Ambon"
    }"#;
}
