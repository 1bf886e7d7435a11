//! HTTP API for the Contribution Engine.
//!
//! This module exposes a minimal REST API around the engine using the
//! [`axum`](https://crates.io/crates/axum) framework.  A front end posts
//! its current [`CalculationInput`] after every change and renders the
//! returned breakdown.  The tables are loaded once at startup and shared
//! read-only between requests.

use crate::config::EngineConfig;
use crate::engine::{compute, compute_batch};
use crate::error::EngineError;
use crate::models::CalculationInput;
use crate::rates::{ContributionRateTable, ProcedureCostTable};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests.
pub struct AppState {
    pub config: EngineConfig,
}

/// Body of `GET /api/defaults`.
#[derive(Debug, Serialize)]
pub struct DefaultsResponse {
    pub input: CalculationInput,
    pub rates: ContributionRateTable,
    pub costs: ProcedureCostTable,
}

/// Build the API router around the given configuration.
pub fn build_router(config: EngineConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState { config });
    let router = Router::new()
        .route("/api/defaults", get(defaults_handler))
        .route("/api/compute", post(compute_handler))
        .route("/api/compute/batch", post(compute_batch_handler))
        .with_state(state.clone());
    (router, state)
}

fn error_response(err: EngineError) -> Response {
    let body = Json(serde_json::json!({"error": err.to_string()}));
    (StatusCode::BAD_REQUEST, body).into_response()
}

/// Handler for GET /api/defaults
async fn defaults_handler(State(app_state): State<Arc<AppState>>) -> Json<DefaultsResponse> {
    let config = &app_state.config;
    Json(DefaultsResponse {
        input: config.default_input(),
        rates: config.rates.clone(),
        costs: config.costs.clone(),
    })
}

/// Handler for POST /api/compute
async fn compute_handler(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<CalculationInput>,
) -> Response {
    let config = &app_state.config;
    match compute(&input, &config.rates, &config.costs) {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Handler for POST /api/compute/batch
async fn compute_batch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(inputs): Json<Vec<CalculationInput>>,
) -> Response {
    let config = &app_state.config;
    match compute_batch(&inputs, &config.rates, &config.costs) {
        Ok(outputs) => (StatusCode::OK, Json(outputs)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Launch the API server.  Binds to the supplied address and blocks
/// until the server terminates (e.g. when interrupted).
pub async fn serve(addr: &str, config: EngineConfig) -> Result<()> {
    let (router, _state) = build_router(config);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationOutput, Modality};
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;

    fn state() -> State<Arc<AppState>> {
        let (_, state) = build_router(EngineConfig::default());
        State(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_handler() {
        let Json(defaults) = defaults_handler(state()).await;
        assert_eq!(defaults.input.worked_days, 30);
        assert_eq!(defaults.costs.procedures.len(), 10);
    }

    #[tokio::test]
    async fn test_compute_handler_ok() {
        let response = compute_handler(state(), Json(CalculationInput::default())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let output: CalculationOutput = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(output.contribution_subtotal, dec!(405697.5));
    }

    #[tokio::test]
    async fn test_compute_handler_rejects_bad_risk_class() {
        let mut input = CalculationInput::default();
        input.include_occupational_risk = true;
        input.occupational_risk_class = 6;
        let response = compute_handler(state(), Json(input)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid argument"));
    }

    #[tokio::test]
    async fn test_compute_handler_rejects_overflowing_base() {
        let body = serde_json::json!({
            "auto_base": false,
            "contribution_base": rust_decimal::Decimal::MAX.to_string(),
        });
        let input: CalculationInput = serde_json::from_value(body).unwrap();
        let response = compute_handler(state(), Json(input)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid argument: amount overflow");
    }

    #[tokio::test]
    async fn test_compute_batch_handler() {
        let mut dependent = CalculationInput::default();
        dependent.modality = Modality::Dependent;
        let response =
            compute_batch_handler(state(), Json(vec![CalculationInput::default(), dependent])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let outputs: Vec<CalculationOutput> =
            serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].modality, Modality::Dependent);
    }
}
