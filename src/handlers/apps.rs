//! App registration and liveness endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{debug, instrument};

use procdoctor::model::{RegisterHint, RegisterResponse, StatusResponse};

use crate::state::SharedState;

/// Handler for `POST /apps/register`.
///
/// Registration is idempotent per (appName, host, port): a re-registration
/// returns the previously assigned id and refreshes liveness.
#[instrument(skip(state, hint), fields(app_name = %hint.app_name))]
pub async fn register_handler(
    State(state): State<SharedState>,
    Json(hint): Json<RegisterHint>,
) -> impl IntoResponse {
    state.stats.record_http_request();

    let record = state.registry.register(hint);
    state.stats.record_registration();
    state.metrics.registered_apps.set(state.registry.len() as f64);

    Json(RegisterResponse {
        app_id: record.id,
        status: record.status,
        message: "App registered successfully".to_string(),
    })
}

/// Handler for `POST /apps/{appId}/heartbeat`. Unknown ids are answered
/// with 200 as well; the ping is best-effort on both sides.
#[instrument(skip(state))]
pub async fn heartbeat_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
) -> impl IntoResponse {
    state.stats.record_http_request();
    state.stats.record_heartbeat();

    let known = state.registry.heartbeat(app_id);
    debug!("Heartbeat for appId {} (known: {})", app_id, known);

    Json(StatusResponse::ok("Heartbeat received"))
}

/// Handler for `POST /apps/{appId}/offline`. Idempotent: a notice for a
/// process that never registered is also success.
#[instrument(skip(state))]
pub async fn offline_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
) -> impl IntoResponse {
    state.stats.record_http_request();
    state.stats.record_offline_notice();

    state.registry.offline(app_id);

    Json(StatusResponse::ok("App marked as offline"))
}

/// Handler for `GET /apps`: all registered apps, newest registration first.
#[instrument(skip(state))]
pub async fn apps_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.registry.all())
}

/// Handler for `GET /apps/running`.
#[instrument(skip(state))]
pub async fn running_apps_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.stats.record_http_request();
    Json(state.registry.running())
}

/// Handler for `GET /apps/{appId}`.
#[instrument(skip(state))]
pub async fn app_handler(
    State(state): State<SharedState>,
    Path(app_id): Path<u64>,
) -> axum::response::Response {
    state.stats.record_http_request();

    match state.registry.get(app_id) {
        Some(app) => Json(app).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusResponse::error(format!("Unknown appId {}", app_id))),
        )
            .into_response(),
    }
}
