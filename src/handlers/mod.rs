//! HTTP endpoint handlers for the collector.
//!
//! This module contains all the HTTP request handlers, organized by
//! concern: app registration, snapshot ingestion and queries, alerts, the
//! live WebSocket push channel, and the collector's own health pages.

pub mod alerts;
pub mod apps;
pub mod health;
pub mod internal;
pub mod metrics;
pub mod root;
pub mod ws;

pub use alerts::{
    acknowledge_alert_handler, alert_stats_handler, alerts_by_app_handler, alerts_handler,
    unacknowledged_alerts_handler,
};
pub use apps::{
    app_handler, apps_handler, heartbeat_handler, offline_handler, register_handler,
    running_apps_handler,
};
pub use health::health_handler;
pub use internal::internal_metrics_handler;
pub use metrics::{
    all_latest_handler, history_handler, ingest_batch_handler, ingest_handler, latest_handler,
};
pub use root::root_handler;
pub use ws::ws_handler;
