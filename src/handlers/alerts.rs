//! Alert query and acknowledge endpoints.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use procdoctor::model::StatusResponse;

use crate::state::SharedState;

/// Handler for `GET /alerts`: all alerts, newest first.
#[instrument(skip(state))]
pub async fn alerts_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.alert_repo.all())
}

/// Handler for `GET /alerts/unacknowledged`.
#[instrument(skip(state))]
pub async fn unacknowledged_alerts_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.alert_repo.unacknowledged())
}

/// Handler for `GET /alerts/app/{appId}`.
#[instrument(skip(state))]
pub async fn alerts_by_app_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.alert_repo.by_app(app_id))
}

/// Handler for `GET /alerts/stats`.
#[instrument(skip(state))]
pub async fn alert_stats_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();

    let unacknowledged = state.alert_repo.unacknowledged_count();
    state.metrics.alerts_unacknowledged.set(unacknowledged as f64);

    Json(json!({ "unacknowledgedCount": unacknowledged }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeBody {
    pub acknowledged_by: Option<String>,
}

/// Handler for `POST /alerts/{alertId}/acknowledge`.
///
/// Idempotent: acknowledging an already-acknowledged or unknown alert is a
/// silent no-op and still answers 200. The body is optional; a missing or
/// malformed body acknowledges as "unknown".
#[instrument(skip(state, body))]
pub async fn acknowledge_alert_handler(
    State(state): State<SharedState>,
    Path(alert_id): Path<u64>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    state.stats.record_http_request();

    let acknowledged_by = serde_json::from_slice::<AcknowledgeBody>(&body)
        .ok()
        .and_then(|b| b.acknowledged_by)
        .unwrap_or_else(|| "unknown".to_string());

    state.alert_engine.acknowledge(alert_id, &acknowledged_by);

    Json(StatusResponse::ok("Alert acknowledged"))
}
