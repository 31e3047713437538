//! HTTP handlers

pub mod health;
pub mod predict;
pub mod auth;

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::credentials::StaticCredentials;
    use crate::enrichment::Enricher;
    use crate::inference::fixtures::{artifacts_with, sample_service};
    use crate::inference::InferenceService;
    use crate::{create_router, AppState};

    fn build_state(service: InferenceService) -> AppState {
        let config = Config::for_tests();
        AppState {
            inference: Arc::new(service),
            enricher: Arc::new(Enricher::from_config(&config).unwrap()),
            credentials: Arc::new(StaticCredentials::from_config(&config).unwrap()),
            config: Arc::new(config),
        }
    }

    /// Sample artifacts, unreachable upstreams, default login
    pub fn test_state() -> AppState {
        build_state(sample_service())
    }

    pub fn state_with(preprocessor: &str, labels: &str) -> AppState {
        build_state(InferenceService::new(artifacts_with(preprocessor, labels)))
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(state, request).await
    }

    pub async fn post_json(state: AppState, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }
}
