use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use brokerlink_core::*;
use brokerlink_workflow as workflow;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Account link lifecycle
        .route("/connect", post(connect))
        .route("/status", post(status))
        .route("/disconnect", post(disconnect))
        // Account data
        .route("/account-info", post(account_info))
        .route("/metrics", post(metrics))
        .route("/trade-history", post(trade_history))
        .route("/daily-growth", post(daily_growth))
}

/// Parse an optional JSON body; an empty body yields the default input.
fn parse_input<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError(RelayError::InvalidArgument(format!("Malformed request body: {}", e))))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Link lifecycle
// ---------------------------------------------------------------------------

async fn connect(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Json<ConnectResponse>, ApiError> {
    let caller = caller.require()?;
    let request: ConnectRequest = parse_input(&body)?;
    let resp = workflow::connect(&state.workflow, Some(&caller), request).await?;
    Ok(Json(resp))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(workflow::status(&state.workflow, caller.as_ref()).await?))
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<DisconnectResponse>, ApiError> {
    Ok(Json(workflow::disconnect(&state.workflow, caller.as_ref()).await?))
}

// ---------------------------------------------------------------------------
// Account data
// ---------------------------------------------------------------------------

async fn account_info(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(workflow::account_info(&state.workflow, caller.as_ref()).await?))
}

async fn metrics(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<MetricsResponse>, ApiError> {
    Ok(Json(workflow::metrics(&state.workflow, caller.as_ref()).await?))
}

async fn trade_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Json<TradeHistoryResponse>, ApiError> {
    let caller = caller.require()?;
    let request: TradeHistoryRequest = parse_input(&body)?;
    let resp = workflow::trade_history(&state.workflow, Some(&caller), request).await?;
    Ok(Json(resp))
}

async fn daily_growth(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<DailyGrowthResponse>, ApiError> {
    Ok(Json(workflow::daily_growth(&state.workflow, caller.as_ref()).await?))
}
