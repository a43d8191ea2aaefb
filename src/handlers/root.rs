//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a landing page with all available endpoints and descriptions.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Procdoctor Collector</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #007bff;
            padding-bottom: 15px;
            margin-bottom: 10px;
        }}
        .subtitle {{ color: #666; margin-bottom: 30px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ text-align: left; padding: 8px 12px; border-bottom: 1px solid #eee; }}
        th {{ color: #333; }}
        code {{ background: #f0f0f0; padding: 2px 6px; border-radius: 4px; }}
        .footer {{ color: #999; font-size: 0.85em; margin-top: 30px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Procdoctor Collector</h1>
        <div class="subtitle">Version {version} &mdash; Uptime {uptime_str}</div>
        <table>
            <tr><th>Endpoint</th><th>Description</th></tr>
            <tr><td><code>POST /apps/register</code></td><td>Register a process, returns its appId</td></tr>
            <tr><td><code>POST /apps/{{appId}}/heartbeat</code></td><td>Liveness ping</td></tr>
            <tr><td><code>POST /apps/{{appId}}/offline</code></td><td>Graceful offline notice</td></tr>
            <tr><td><code>GET /apps</code>, <code>/apps/running</code>, <code>/apps/{{appId}}</code></td><td>Registered processes</td></tr>
            <tr><td><code>POST /metrics</code>, <code>/metrics/batch</code></td><td>Snapshot ingestion</td></tr>
            <tr><td><code>GET /metrics/{{appId}}/latest</code></td><td>Latest snapshot for a process</td></tr>
            <tr><td><code>GET /metrics/{{appId}}/history?since=ms</code></td><td>Snapshot history</td></tr>
            <tr><td><code>GET /metrics/all/latest</code></td><td>Latest snapshot of every running process</td></tr>
            <tr><td><code>GET /alerts</code>, <code>/alerts/unacknowledged</code>, <code>/alerts/app/{{appId}}</code>, <code>/alerts/stats</code></td><td>Alert queries</td></tr>
            <tr><td><code>POST /alerts/{{alertId}}/acknowledge</code></td><td>Acknowledge an alert</td></tr>
            <tr><td><code>GET /ws/metrics?appId=N</code></td><td>Live WebSocket push channel</td></tr>
            <tr><td><code>GET /health</code></td><td>Collector health statistics</td></tr>
            <tr><td><code>GET /internal/metrics</code></td><td>Collector self-telemetry (Prometheus)</td></tr>
        </table>
        <div class="footer">{FOOTER_TEXT}</div>
    </div>
</body>
</html>"#
    );

    Html(html)
}
