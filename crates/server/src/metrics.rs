//! Prometheus metrics
//!
//! Counters are recorded through the `metrics` facade; the exporter's
//! handle renders them for `/metrics`.

use axum::{
    extract::{MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::state::AppState;
use crate::ServerError;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder, once per process
///
/// Returns `None` if another recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .map(Clone::clone)
        .map_err(|e| tracing::warn!(error = %e, "Failed to install Prometheus recorder"))
        .ok()
}

/// Count a completed calculation (`full`, `schedule`, `stamp_duty`, `lmi`)
pub fn record_calculation(kind: &'static str) {
    metrics::counter!("haus_calculations_total", "kind" => kind).increment(1);
}

/// Count a rejected input by error code
pub fn record_validation_failure(code: &'static str) {
    metrics::counter!("haus_validation_failures_total", "code" => code).increment(1);
}

pub fn record_request(endpoint: String, status: u16) {
    metrics::counter!(
        "haus_http_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Middleware counting requests per matched route and status
pub async fn track_requests(req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;
    record_request(endpoint, response.status().as_u16());
    response
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ServerError> {
    let enabled = state.get_config().observability.metrics_enabled;
    match state.metrics_handle() {
        Some(handle) if enabled => Ok((
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response()),
        _ => Err(ServerError::NotFound("metrics are disabled".to_string())),
    }
}
