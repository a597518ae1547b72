// HTTP handlers: one ledger operation per endpoint

use crate::{error::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use points_ledger::{Balances, CreditRequest, PayerDelta, SpendRequest};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

/// POST /add
pub async fn add_points(
    State(state): State<AppState>,
    payload: Result<Json<CreditRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let tx = state.ledger.credit(request).await?;

    info!("Added {} points for {} (id {})", tx.points, tx.payer, tx.id);
    Ok(StatusCode::OK)
}

/// POST /spend
pub async fn spend_points(
    State(state): State<AppState>,
    payload: Result<Json<SpendRequest>, JsonRejection>,
) -> Result<Json<Vec<PayerDelta>>, ApiError> {
    let Json(request) = payload?;
    let amount = request.validate()?;
    let deltas = state.ledger.spend(amount).await?;

    info!("Spent {} points across {} payers", amount, deltas.len());
    Ok(Json(deltas))
}

/// GET /balance
pub async fn get_balance(State(state): State<AppState>) -> Result<Json<Balances>, ApiError> {
    let balances = state.ledger.balance().await?;
    Ok(Json(balances))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .ledger
        .metrics()
        .export()
        .map_err(|e| ApiError::Internal(format!("Failed to export metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
