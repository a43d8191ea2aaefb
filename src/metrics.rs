//! Prometheus self-telemetry for the collector.
//!
//! These instruments cover the collector's own behavior, not the monitored
//! fleet; they are served at /internal/metrics.

use prometheus::{Gauge, IntCounter, Registry};

/// Collector self-telemetry instruments, registered against one registry.
pub struct CollectorMetrics {
    pub ingest_total: IntCounter,
    pub ingest_rejected_total: IntCounter,
    pub alerts_total: Gauge,
    pub alerts_unacknowledged: Gauge,
    pub registered_apps: Gauge,
    pub running_apps: Gauge,
    pub observer_connections: Gauge,
    pub liveness_transitions_total: IntCounter,
    pub retention_deleted_total: IntCounter,
    pub liveness_sweep_duration_seconds: Gauge,
    pub retention_sweep_duration_seconds: Gauge,
}

impl CollectorMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let ingest_total = IntCounter::new(
            "procdoctor_ingest_total",
            "Number of snapshots accepted by the ingestion service",
        )?;
        let ingest_rejected_total = IntCounter::new(
            "procdoctor_ingest_rejected_total",
            "Number of snapshots rejected for unknown identity",
        )?;
        let alerts_total = Gauge::new(
            "procdoctor_alerts_total",
            "Number of alerts currently stored (acknowledged included)",
        )?;
        let alerts_unacknowledged = Gauge::new(
            "procdoctor_alerts_unacknowledged",
            "Number of unacknowledged alerts",
        )?;
        let registered_apps = Gauge::new(
            "procdoctor_registered_apps",
            "Number of processes known to the registry",
        )?;
        let running_apps = Gauge::new(
            "procdoctor_running_apps",
            "Number of processes currently considered running",
        )?;
        let observer_connections = Gauge::new(
            "procdoctor_observer_connections",
            "Number of live observer connections",
        )?;
        let liveness_transitions_total = IntCounter::new(
            "procdoctor_liveness_transitions_total",
            "Number of running-to-offline transitions made by the liveness sweep",
        )?;
        let retention_deleted_total = IntCounter::new(
            "procdoctor_retention_deleted_total",
            "Number of snapshots deleted by the retention sweep",
        )?;
        let liveness_sweep_duration_seconds = Gauge::new(
            "procdoctor_liveness_sweep_duration_seconds",
            "Time spent in the last liveness sweep",
        )?;
        let retention_sweep_duration_seconds = Gauge::new(
            "procdoctor_retention_sweep_duration_seconds",
            "Time spent in the last retention sweep",
        )?;

        registry.register(Box::new(ingest_total.clone()))?;
        registry.register(Box::new(ingest_rejected_total.clone()))?;
        registry.register(Box::new(alerts_total.clone()))?;
        registry.register(Box::new(alerts_unacknowledged.clone()))?;
        registry.register(Box::new(registered_apps.clone()))?;
        registry.register(Box::new(running_apps.clone()))?;
        registry.register(Box::new(observer_connections.clone()))?;
        registry.register(Box::new(liveness_transitions_total.clone()))?;
        registry.register(Box::new(retention_deleted_total.clone()))?;
        registry.register(Box::new(liveness_sweep_duration_seconds.clone()))?;
        registry.register(Box::new(retention_sweep_duration_seconds.clone()))?;

        Ok(Self {
            ingest_total,
            ingest_rejected_total,
            alerts_total,
            alerts_unacknowledged,
            registered_apps,
            running_apps,
            observer_connections,
            liveness_transitions_total,
            retention_deleted_total,
            liveness_sweep_duration_seconds,
            retention_sweep_duration_seconds,
        })
    }
}
