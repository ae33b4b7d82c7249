//! HTTP handlers for the gateway routes.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{
    metrics::MetricsCollector,
    model::ResponseEnvelope,
    pipeline::{GatewayResponse, RequestPipeline},
};
use serde_json::json;
use std::sync::Arc;

/// Shared handler state.
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub metrics: Arc<MetricsCollector>,
}

/// `POST /SoapGateway` and `POST /SoapDynamicGateway`.
///
/// Both paths feed the same pipeline; the legacy system exposed two
/// route names for the same translation and existing callers use both.
pub async fn handle_gateway(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let response = state.pipeline.handle(&headers, &body).await;
    into_axum_response(response)
}

fn into_axum_response(response: GatewayResponse) -> Response {
    (response.status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
}

/// `GET /circuitbreakerfallback`.
///
/// Kept for callers of the legacy fallback route: returns the same
/// envelope a tripped circuit would produce inline.
pub async fn handle_circuit_breaker_fallback() -> Response {
    let envelope = ResponseEnvelope::system_error(
        "KOL_SYS_ERR",
        "service temporarily unavailable",
        "",
        "",
        "KOL",
    );
    (StatusCode::OK, Json(envelope)).into_response()
}

/// `GET /health`.
pub async fn handle_health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// `GET /metrics`: Prometheus exposition text.
pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, [(CONTENT_TYPE, "text/plain; version=0.0.4")], state.metrics.render())
        .into_response()
}
