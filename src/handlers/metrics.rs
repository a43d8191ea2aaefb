//! Snapshot ingestion and query endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{instrument, warn};

use procdoctor::ingest::IngestError;
use procdoctor::model::{MetricSnapshot, MetricsRequest, StatusResponse};

use crate::state::SharedState;

fn ingest_one(state: &SharedState, request: &MetricsRequest) -> Result<(), IngestError> {
    let start = Instant::now();
    let result = state.ingestion.ingest(request.app_id, &request.metrics);

    match &result {
        Ok(_) => {
            state
                .stats
                .record_ingest_accepted(start.elapsed().as_secs_f64() * 1000.0);
            state.metrics.ingest_total.inc();
        }
        Err(IngestError::UnknownApp(_)) => {
            state.stats.record_ingest_rejected();
            state.metrics.ingest_rejected_total.inc();
        }
        Err(IngestError::Persistence(_)) => {}
    }

    result.map(|_| ())
}

/// Handler for `POST /metrics`: ingest one snapshot.
#[instrument(skip(state, request), fields(app_id = request.app_id))]
pub async fn ingest_handler(
    State(state): State<SharedState>,
    Json(request): Json<MetricsRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    let start = Instant::now();
    state.stats.record_http_request();

    let result = ingest_one(&state, &request);
    state
        .stats
        .record_request_duration(start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(()) => (StatusCode::OK, Json(StatusResponse::ok("Metrics received"))),
        Err(e @ IngestError::UnknownApp(_)) => {
            warn!("Rejected snapshot: {}", e);
            (StatusCode::NOT_FOUND, Json(StatusResponse::error(e.to_string())))
        }
        Err(e @ IngestError::Persistence(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse::error(e.to_string())),
        ),
    }
}

/// Handler for `POST /metrics/batch`: ingest an array of snapshot bodies.
/// Items are processed independently; one rejected item does not fail the
/// rest.
#[instrument(skip(state, requests))]
pub async fn ingest_batch_handler(
    State(state): State<SharedState>,
    Json(requests): Json<Vec<MetricsRequest>>,
) -> impl IntoResponse {
    state.stats.record_http_request();

    let mut processed = 0usize;
    let mut rejected = 0usize;
    for request in &requests {
        match ingest_one(&state, request) {
            Ok(()) => processed += 1,
            Err(e) => {
                warn!("Batch item for appId {} failed: {}", request.app_id, e);
                rejected += 1;
            }
        }
    }

    Json(json!({
        "status": "ok",
        "processed": processed,
        "rejected": rejected,
    }))
}

/// Handler for `GET /metrics/{appId}/latest`.
#[instrument(skip(state))]
pub async fn latest_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
) -> axum::response::Response {
    state.stats.record_http_request();

    match state.metrics_repo.latest(app_id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusResponse::error(format!(
                "No snapshots for appId {}",
                app_id
            ))),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Epoch milliseconds; snapshots strictly newer are returned.
    #[serde(default)]
    pub since: i64,
}

/// Handler for `GET /metrics/{appId}/history?since=<epochMillis>`.
#[instrument(skip(state))]
pub async fn history_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.metrics_repo.history(app_id, query.since))
}

/// Handler for `GET /metrics/all/latest`: the latest snapshot of every
/// running process.
#[instrument(skip(state))]
pub async fn all_latest_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();

    let snapshots: Vec<MetricSnapshot> = state
        .registry
        .running()
        .iter()
        .filter_map(|app| state.metrics_repo.latest(app.id))
        .collect();

    Json(snapshots)
}
