//! Login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::models::{LoginRequest, LoginResponse};
use crate::{AppError, AppResult, AppState};

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(req) = payload?;

    // Argon2 verification is CPU bound
    let verifier = state.credentials.clone();
    let email = req.email.clone();
    let valid = tokio::task::spawn_blocking(move || verifier.verify(&req.email, &req.password))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    if !valid {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!("User logged in: {}", email);
    Ok(Json(LoginResponse { current_user: email }))
}
