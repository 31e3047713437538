//! Liveness, health check and model metadata handlers

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{AppError, AppResult, AppState};

/// `GET /`
pub async fn home() -> Json<Value> {
    tracing::debug!("Received request to home endpoint");
    Json(json!({ "message": "MitigasiKita API is running" }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    weather_provider: &'static str,
}

/// `GET /health`
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        weather_provider: state.enricher.weather_provider(),
    })
}

/// `GET /model`
pub async fn model_info(State(state): State<AppState>) -> AppResult<Json<Value>> {
    serde_json::to_value(state.inference.info())
        .map(Json)
        .map_err(|e| AppError::InternalError(e.to_string()))
}
