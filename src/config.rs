//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default CORS origin of the MitigasiKita web frontend
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8000";

/// Which weather provider the enrichment step talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherProviderKind {
    /// Open-Meteo daily forecast (no API key)
    OpenMeteo,
    /// OpenWeatherMap current weather (requires API key)
    OpenWeatherMap { api_key: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Debug mode (verbose logging)
    pub debug: bool,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,

    /// Allowed CORS origin, `*` for any
    pub cors_allowed_origin: String,

    /// Trained classifier artifact
    pub model_path: PathBuf,

    /// Fitted preprocessor artifact
    pub preprocessor_path: PathBuf,

    /// Fitted label encoder artifact
    pub label_encoder_path: PathBuf,

    /// Weather provider used for enrichment
    pub weather_provider: WeatherProviderKind,

    /// OpenWeatherMap was requested without an API key
    pub weather_api_key_missing: bool,

    pub open_meteo_url: String,
    pub openweathermap_url: String,
    pub nominatim_url: String,

    /// `accept-language` passed to the geocoder
    pub geocoder_language: String,

    /// User-Agent required by the Nominatim usage policy
    pub geocoder_user_agent: String,

    /// Timeout for each outbound enrichment call
    pub enrichment_timeout: Duration,

    /// The single account allowed through `/login`
    pub login_email: String,

    /// Plain password, hashed at startup when no hash is configured
    pub login_password: String,

    /// Pre-computed Argon2 PHC hash, takes precedence over `login_password`
    pub login_password_hash: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let model_dir = PathBuf::from(env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string()));
        let requested_provider = env::var("WEATHER_PROVIDER").ok();
        let weather_provider = weather_provider_from(
            requested_provider.as_deref(),
            env::var("OPENWEATHERMAP_API_KEY").ok(),
        );

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            debug: env::var("DEBUG")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),

            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| model_dir.join("model.onnx")),

            preprocessor_path: env::var("PREPROCESSOR_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| model_dir.join("preprocessor.json")),

            label_encoder_path: env::var("LABEL_ENCODER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| model_dir.join("label_encoder.json")),

            weather_api_key_missing: requested_provider.as_deref().map(wants_openweathermap).unwrap_or(false)
                && weather_provider == WeatherProviderKind::OpenMeteo,

            weather_provider,

            open_meteo_url: env::var("OPEN_METEO_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),

            openweathermap_url: env::var("OPENWEATHERMAP_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5/weather".to_string()),

            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/reverse".to_string()),

            geocoder_language: env::var("GEOCODER_LANGUAGE").unwrap_or_else(|_| "id".to_string()),

            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "mitigasi_kita".to_string()),

            enrichment_timeout: Duration::from_secs(
                env::var("ENRICHMENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),

            login_email: env::var("LOGIN_EMAIL").unwrap_or_else(|_| "test@example.com".to_string()),

            login_password: env::var("LOGIN_PASSWORD").unwrap_or_else(|_| "password".to_string()),

            login_password_hash: env::var("LOGIN_PASSWORD_HASH").ok().filter(|h| !h.is_empty()),
        }
    }

    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default tracing filter when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "mitigasi_server=debug,tower_http=debug"
        } else {
            "mitigasi_server=info,tower_http=info"
        }
    }

    /// Whether CORS is open to every origin
    pub fn cors_allows_any(&self) -> bool {
        self.cors_allowed_origin.trim() == "*"
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn wants_openweathermap(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase();
    name == "openweathermap" || name == "owm"
}

/// OpenWeatherMap needs a key; without one the key-free provider is used
fn weather_provider_from(name: Option<&str>, api_key: Option<String>) -> WeatherProviderKind {
    if !name.map(wants_openweathermap).unwrap_or(false) {
        return WeatherProviderKind::OpenMeteo;
    }

    match api_key.filter(|k| !k.trim().is_empty()) {
        Some(api_key) => WeatherProviderKind::OpenWeatherMap { api_key },
        None => WeatherProviderKind::OpenMeteo,
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for tests: every upstream points at a closed local port
    pub fn for_tests() -> Self {
        let unreachable = "http://127.0.0.1:9/unreachable".to_string();
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            debug: true,
            log_json: false,
            cors_allowed_origin: DEFAULT_CORS_ORIGIN.to_string(),
            model_path: PathBuf::from("models/model.onnx"),
            preprocessor_path: PathBuf::from("models/preprocessor.json"),
            label_encoder_path: PathBuf::from("models/label_encoder.json"),
            weather_provider: WeatherProviderKind::OpenMeteo,
            weather_api_key_missing: false,
            open_meteo_url: unreachable.clone(),
            openweathermap_url: unreachable.clone(),
            nominatim_url: unreachable,
            geocoder_language: "id".to_string(),
            geocoder_user_agent: "mitigasi_kita_tests".to_string(),
            enrichment_timeout: Duration::from_secs(2),
            login_email: "test@example.com".to_string(),
            login_password: "password".to_string(),
            login_password_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_weather_provider_selection() {
        assert_eq!(weather_provider_from(None, None), WeatherProviderKind::OpenMeteo);
        assert_eq!(
            weather_provider_from(Some("open-meteo"), Some("k".to_string())),
            WeatherProviderKind::OpenMeteo
        );
        assert_eq!(
            weather_provider_from(Some("OpenWeatherMap"), Some("abc".to_string())),
            WeatherProviderKind::OpenWeatherMap { api_key: "abc".to_string() }
        );
        // Missing key falls back to the key-free provider
        assert_eq!(
            weather_provider_from(Some("openweathermap"), Some("  ".to_string())),
            WeatherProviderKind::OpenMeteo
        );
    }

    #[test]
    fn test_bind_addr_and_filter() {
        let mut config = Config::for_tests();
        config.port = 5000;
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert!(config.default_log_filter().contains("debug"));
        config.debug = false;
        assert!(config.default_log_filter().contains("info"));
    }

    #[test]
    fn test_cors_any() {
        let mut config = Config::for_tests();
        assert!(!config.cors_allows_any());
        config.cors_allowed_origin = "*".to_string();
        assert!(config.cors_allows_any());
    }
}
