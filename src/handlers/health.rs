//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! collector health statistics and a fleet summary.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use procdoctor::model::AppStatus;

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str =
    "Project: https://github.com/cansp-dev/procdoctor — Support: exporter@herakles.now";

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    state.stats.record_http_request();

    // Calculate uptime
    let uptime_seconds = state.stats.get_uptime_seconds();
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    // Render plain-text table from CollectorStats
    let table = state.stats.render_table();
    let fleet = render_fleet_summary(&state);

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("OK\n\nUptime: {uptime_str}\n\n{table}\n{fleet}\n{FOOTER_TEXT}"),
    )
}

/// Renders the current fleet and observer summary as a plain-text table.
fn render_fleet_summary(state: &SharedState) -> String {
    let apps = state.registry.all();
    let running = apps
        .iter()
        .filter(|a| a.status == AppStatus::Running)
        .count();
    let offline = apps.len() - running;
    let unacknowledged = state.alert_repo.unacknowledged_count();
    let observers = state.hub.connection_count();

    let mut out = String::new();
    writeln!(out, "FLEET").ok();
    writeln!(out, "=====").ok();
    writeln!(out).ok();
    writeln!(out, "{:26} | {}", "registered_apps", apps.len()).ok();
    writeln!(out, "{:26} | {}", "running_apps", running).ok();
    writeln!(out, "{:26} | {}", "offline_apps", offline).ok();
    writeln!(out, "{:26} | {}", "unacknowledged_alerts", unacknowledged).ok();
    writeln!(out, "{:26} | {}", "observer_connections", observers).ok();
    out
}
