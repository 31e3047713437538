//! MitigasiKita API Server
//!
//! Serves a pre-trained earthquake/tsunami risk classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MITIGASIKITA API                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  POST /predict                                              │
//! │     │                                                       │
//! │     ▼                                                       │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │ Enricher  │──▶│  Feature     │──▶│  Inference       │   │
//! │  │ (weather, │   │  Assembler   │   │  (preprocessor → │   │
//! │  │  geocode) │   │              │   │   ONNX model)    │   │
//! │  └─────┬─────┘   └──────────────┘   └────────┬─────────┘   │
//! │        ▼                                      ▼             │
//! │  Open-Meteo / OpenWeatherMap          model.onnx            │
//! │  Nominatim                            preprocessor.json     │
//! │                                       label_encoder.json    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod credentials;
mod enrichment;
mod error;
mod features;
mod handlers;
mod inference;
mod models;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    http::{header, HeaderValue, Method},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use config::Config;
use credentials::{CredentialVerifier, StaticCredentials};
use enrichment::Enricher;
use inference::{ArtifactPaths, Artifacts, InferenceService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_log_filter().into());
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("MitigasiKita API starting...");
    if config.weather_api_key_missing {
        tracing::warn!("WEATHER_PROVIDER=openweathermap but OPENWEATHERMAP_API_KEY is not set, using Open-Meteo");
    }

    // Artifacts are loaded once; any failure stops startup
    let artifacts = Artifacts::load(&ArtifactPaths::from_config(&config))
        .context("Failed to load model artifacts")?;

    let enricher = Enricher::from_config(&config).context("Failed to create HTTP client")?;
    let credentials = StaticCredentials::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Invalid login credentials configuration: {}", e))?;

    let addr = config.bind_addr();

    // Build application state
    let state = AppState {
        inference: Arc::new(InferenceService::new(artifacts)),
        enricher: Arc::new(enricher),
        credentials: Arc::new(credentials),
        config: Arc::new(config),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Shared application state, read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub inference: Arc<InferenceService>,
    pub enricher: Arc<Enricher>,
    pub credentials: Arc<dyn CredentialVerifier>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::health::home))
        .route("/health", get(handlers::health::check))
        .route("/model", get(handlers::health::model_info))
        .route("/predict", post(handlers::predict::predict))
        .route("/login", post(handlers::auth::login))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_allows_any() {
        return layer.allow_origin(Any);
    }

    match config.cors_allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(AllowOrigin::list([origin])),
        Err(_) => {
            tracing::warn!(
                "Invalid CORS_ALLOWED_ORIGIN '{}', falling back to {}",
                config.cors_allowed_origin,
                config::DEFAULT_CORS_ORIGIN
            );
            layer.allow_origin(AllowOrigin::list([HeaderValue::from_static(config::DEFAULT_CORS_ORIGIN)]))
        }
    }
}
