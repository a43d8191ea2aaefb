//! Application state management for the collector.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background sweep tasks.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use procdoctor::alerts::AlertEngine;
use procdoctor::fanout::FanoutHub;
use procdoctor::ingest::IngestionService;
use procdoctor::registry::ProcessRegistry;
use procdoctor::store::{AlertRepository, MetricsRepository};

use crate::config::Config;
use crate::metrics::CollectorMetrics;
use crate::stats::CollectorStats;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Arc<ProcessRegistry>,
    pub metrics_repo: Arc<dyn MetricsRepository>,
    pub alert_repo: Arc<dyn AlertRepository>,
    pub alert_engine: Arc<AlertEngine>,
    pub ingestion: IngestionService,
    pub hub: Arc<FanoutHub>,
    pub config: Arc<Config>,
    pub stats: Arc<CollectorStats>,
    /// Prometheus registry for collector self-telemetry.
    pub prom_registry: Registry,
    pub metrics: CollectorMetrics,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
