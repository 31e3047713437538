//! Prediction handler
//!
//! validate -> enrich -> assemble -> infer. Validation failures are 400,
//! inference failures are 500 with the underlying message.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::features::{collect_fields, RawInputs};
use crate::models::{PredictRequest, PredictResponse};
use crate::{AppError, AppResult, AppState};

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let (Some(latitude), Some(longitude)) = (req.latitude, req.longitude) else {
        return Err(AppError::ValidationError(
            "Missing required fields (latitude, longitude)".to_string(),
        ));
    };

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, latitude, longitude, magnitude = ?req.magnitude, depth = ?req.depth, "Prediction request");

    let enrichment = state.enricher.enrich(latitude, longitude).await;

    let service = state.inference.clone();
    let inputs = RawInputs::new(
        latitude,
        longitude,
        req.magnitude,
        req.depth,
        service.placeholders(),
        &enrichment,
    );
    let tsunami = inputs.tsunami;
    let fields = collect_fields(&inputs, service.placeholders());

    let result = tokio::task::spawn_blocking(move || {
        let row = service.assembler().assemble(&fields);
        service.predict(&row)
    })
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    if result.is_error() {
        return Err(AppError::PredictionFailed(result.error.unwrap_or_default()));
    }

    tracing::info!(
        %request_id,
        label = %result.label,
        confidence = result.confidence,
        potensi_tsunami = tsunami.as_str(),
        data_source = ?enrichment.data_source,
        "Prediction result"
    );

    Ok(Json(PredictResponse::new(request_id, result, tsunami, enrichment)))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{post_json, state_with, test_state};
    use crate::inference::fixtures::LABELS_JSON;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_predict_success() {
        let (status, body) = post_json(test_state(), "/predict", json!({"latitude": -3.7, "longitude": 128.2})).await;
        assert_eq!(status, StatusCode::OK);
        let label = body["prediksi_risiko"].as_str().unwrap();
        assert!(["Rendah", "Sedang", "Tinggi"].contains(&label));
        let confidence = body["tingkat_keyakinan"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(body["potensi_tsunami"], "Rendah");
        // Upstreams are unreachable in tests
        assert_eq!(body["location"], "Banda Sea");
        assert_eq!(body["city"], "Ambon");
        assert_eq!(body["temperature"], 25.0);
        assert_eq!(body["humidity"], 70.0);
        assert_eq!(body["weather"], "Clear");
        assert_eq!(body["data_source"]["weather"], "fallback");
        assert_eq!(body["data_source"]["location"], "fallback");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_predict_with_quake_details() {
        let (status, body) = post_json(
            test_state(),
            "/predict",
            json!({"latitude": "-3.7", "longitude": 128.2, "magnitude_aktual": 7.5, "kedalaman_aktual": 10}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediksi_risiko"], "Tinggi");
        assert_eq!(body["potensi_tsunami"], "Tinggi");

        let (_, body) = post_json(test_state(), "/predict", json!({"latitude": 0, "longitude": 0, "magnitude": 6.5, "depth": 50})).await;
        assert_eq!(body["potensi_tsunami"], "Sedang");
    }

    #[tokio::test]
    async fn test_out_of_range_is_400() {
        for body in [
            json!({"latitude": 91, "longitude": 0}),
            json!({"latitude": -90.01, "longitude": 0}),
            json!({"latitude": 0, "longitude": 180.5}),
            json!({"latitude": 0, "longitude": -181}),
        ] {
            let (status, response) = post_json(test_state(), "/predict", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["status"], 400);
            assert!(response["error"].as_str().unwrap().contains("between"));
        }
    }

    #[tokio::test]
    async fn test_quake_details_out_of_range_is_400() {
        for body in [
            json!({"latitude": 0, "longitude": 0, "magnitude": 1e308, "depth": 10}),
            json!({"latitude": 0, "longitude": 0, "magnitude": -0.1}),
            json!({"latitude": 0, "longitude": 0, "magnitude_aktual": 10.5}),
            json!({"latitude": 0, "longitude": 0, "depth": -1}),
            json!({"latitude": 0, "longitude": 0, "kedalaman_aktual": 1000.5}),
        ] {
            let (status, response) = post_json(test_state(), "/predict", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(response["error"].as_str().unwrap().contains("between"));
        }

        let (status, _) = post_json(
            test_state(),
            "/predict",
            json!({"latitude": 0, "longitude": 0, "magnitude": 10, "depth": 1000}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = post_json(
            test_state(),
            "/predict",
            json!({"latitude": 0, "longitude": 0, "magnitude": 0, "depth": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_fields_is_400() {
        let (status, body) = post_json(test_state(), "/predict", json!({"longitude": 128.2})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Missing required fields"));

        let (status, _) = post_json(test_state(), "/predict", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, body) = post_json(test_state(), "/predict", json!({"latitude": "north", "longitude": 1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = post_json(test_state(), "/predict", json!("hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        // Fallback city "Ambon" is not a known category and unknowns are errors
        let preprocessor = r#"{
            "feature_names_in": ["latitude", "longitude", "temperature_2m_max", "precipitation_sum",
                                 "magnitude", "depth", "city", "potensi_tsunami", "agency"],
            "transformers": [
                {"kind": "standard_scaler",
                 "columns": ["latitude", "longitude", "temperature_2m_max", "precipitation_sum", "magnitude", "depth"],
                 "mean": [0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1]},
                {"kind": "one_hot", "columns": ["city", "potensi_tsunami"],
                 "categories": [["Jakarta", "Tual"], ["Rendah", "Sedang", "Tinggi"]],
                 "handle_unknown": "error"}
            ]
        }"#;
        let state = state_with(preprocessor, LABELS_JSON);

        let (status, body) = post_json(state, "/predict", json!({"latitude": 1, "longitude": 1})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 500);
        assert!(body["error"].as_str().unwrap().contains("Ambon"));
    }
}
