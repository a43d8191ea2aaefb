//! Collector self-telemetry endpoint in Prometheus text format.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use tracing::{error, instrument};

use procdoctor::model::AppStatus;

use crate::state::SharedState;

/// Handler for `GET /internal/metrics`.
#[instrument(skip(state))]
pub async fn internal_metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();

    // Refresh the point-in-time gauges before encoding.
    let apps = state.registry.all();
    let running = apps
        .iter()
        .filter(|a| a.status == AppStatus::Running)
        .count();
    state.metrics.registered_apps.set(apps.len() as f64);
    state.metrics.running_apps.set(running as f64);
    state
        .metrics
        .observer_connections
        .set(state.hub.connection_count() as f64);
    state
        .metrics
        .alerts_total
        .set(state.alert_repo.all().len() as f64);
    state
        .metrics
        .alerts_unacknowledged
        .set(state.alert_repo.unacknowledged_count() as f64);

    let families = state.prom_registry.gather();
    let mut buffer = Vec::with_capacity(16 * 1024);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics".to_string(),
        );
    }

    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics".to_string(),
        ),
    }
}
