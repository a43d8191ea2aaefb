//! Procdoctor Telemetry Pipeline Library
//!
//! This library provides both halves of the procdoctor telemetry pipeline:
//! the collector-side core (process registry, snapshot ingestion, threshold
//! alerting, live fan-out, record stores) and the process-side agent
//! (registration client and report loop). The `procdoctor` binary wires the
//! collector core into an HTTP server; the agent half is meant to be
//! embedded into monitored processes.
//!
//! # Features
//!
//! - **Idempotent registration**: one identity per `(name, host, port)`
//! - **Threshold alerting**: heap/CPU/GC rules with a dedup window
//! - **Live fan-out**: best-effort push to WebSocket observers
//! - **Liveness and retention sweeps**: offline detection and bounded
//!   snapshot history
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use procdoctor::agent::{AgentConfig, Reporter};
//!
//! # async fn run() {
//! let config = AgentConfig {
//!     server_url: "http://collector:9610".into(),
//!     app_name: "billing".into(),
//!     host: "10.0.0.5".into(),
//!     port: 8080,
//!     ..AgentConfig::default()
//! };
//!
//! let reporter = Reporter::start(
//!     config,
//!     Arc::new(|| HashMap::from([("heap.used".to_string(), 512.0)])),
//! )
//! .await;
//!
//! // ... process runs ...
//! reporter.shutdown().await;
//! # }
//! ```

pub mod agent;
pub mod alerts;
pub mod fanout;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use alerts::{AlertConfig, AlertEngine};
pub use fanout::{BroadcastOutcome, FanoutHub};
pub use ingest::{IngestError, IngestionService};
pub use model::{Alert, AlertLevel, AppRecord, AppStatus, MetricSnapshot, PushEvent, RegisterHint};
pub use registry::ProcessRegistry;
pub use store::{
    AlertRepository, InMemoryAlertRepository, InMemoryMetricsRepository, MetricsRepository,
};
