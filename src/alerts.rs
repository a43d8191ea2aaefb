//! Threshold alert engine with deduplication.
//!
//! Rules are evaluated independently per metric family on every ingested
//! snapshot. A rule whose metric is absent is skipped, not failed. Before a
//! new alert of a given `(app, type)` is persisted, the most recent
//! unacknowledged alert of that type is checked: a breach inside the dedup
//! window is suppressed. Created alerts are persisted first and handed to
//! fan-out only if persistence succeeded, so observers are never notified
//! about an alert with no durable record.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::fanout::FanoutHub;
use crate::model::{now_ms, Alert, AlertLevel, MetricSnapshot, PushEvent};
use crate::store::AlertRepository;

/// Thresholds and dedup window for the engine. Defaults mirror the
/// collector's shipped configuration.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Heap usage ratio above which `high_heap_usage` fires.
    pub heap_usage_threshold: f64,
    /// CPU usage ratio above which `high_cpu_usage` fires.
    pub cpu_usage_threshold: f64,
    /// GC-time-to-uptime ratio above which `high_gc_time` fires.
    pub gc_time_ratio_threshold: f64,
    /// Window during which repeated breaches of the same type for the same
    /// process are suppressed.
    pub dedup_window_ms: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            heap_usage_threshold: 0.90,
            cpu_usage_threshold: 0.80,
            gc_time_ratio_threshold: 0.10,
            dedup_window_ms: 300_000,
        }
    }
}

pub const ALERT_HIGH_HEAP_USAGE: &str = "high_heap_usage";
pub const ALERT_HIGH_CPU_USAGE: &str = "high_cpu_usage";
pub const ALERT_HIGH_GC_TIME: &str = "high_gc_time";

pub struct AlertEngine {
    config: AlertConfig,
    repository: Arc<dyn AlertRepository>,
    hub: Arc<FanoutHub>,
}

impl AlertEngine {
    pub fn new(
        config: AlertConfig,
        repository: Arc<dyn AlertRepository>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            config,
            repository,
            hub,
        }
    }

    /// Evaluates all threshold rules against a snapshot, applying the dedup
    /// window as of `now`. Returns the alerts that were actually created.
    pub fn evaluate_at(&self, now: i64, snapshot: &MetricSnapshot) -> Vec<Alert> {
        let mut created = Vec::new();

        if let Some(heap_usage) = snapshot.heap_usage {
            if heap_usage > self.config.heap_usage_threshold {
                if let Some(alert) = self.create_alert(
                    now,
                    snapshot.app_id,
                    ALERT_HIGH_HEAP_USAGE,
                    format!("Heap usage: {:.1}%", heap_usage * 100.0),
                ) {
                    created.push(alert);
                }
            }
        }

        if let Some(cpu_usage) = snapshot.cpu_usage {
            if cpu_usage > self.config.cpu_usage_threshold {
                if let Some(alert) = self.create_alert(
                    now,
                    snapshot.app_id,
                    ALERT_HIGH_CPU_USAGE,
                    format!("CPU usage: {:.1}%", cpu_usage * 100.0),
                ) {
                    created.push(alert);
                }
            }
        }

        if let (Some(gc_time), Some(uptime)) = (snapshot.gc_time, snapshot.uptime) {
            if uptime > 0 {
                let ratio = gc_time as f64 / uptime as f64;
                if ratio > self.config.gc_time_ratio_threshold {
                    if let Some(alert) = self.create_alert(
                        now,
                        snapshot.app_id,
                        ALERT_HIGH_GC_TIME,
                        format!("GC time ratio: {:.1}%", ratio * 100.0),
                    ) {
                        created.push(alert);
                    }
                }
            }
        }

        created
    }

    /// Evaluates against the current clock.
    pub fn evaluate(&self, snapshot: &MetricSnapshot) -> Vec<Alert> {
        self.evaluate_at(now_ms(), snapshot)
    }

    /// Acknowledges an alert. Missing ids and repeated acknowledgements are
    /// silent no-ops.
    pub fn acknowledge(&self, alert_id: u64, acknowledged_by: &str) {
        self.repository
            .acknowledge(alert_id, acknowledged_by, now_ms());
    }

    fn create_alert(
        &self,
        now: i64,
        app_id: u64,
        alert_type: &str,
        message: String,
    ) -> Option<Alert> {
        // Suppress repeats inside the dedup window. Acknowledging an alert
        // does not retroactively reopen an elapsed window.
        if let Some(recent) = self.repository.latest_unacknowledged(app_id, alert_type) {
            if now - recent.created_at < self.config.dedup_window_ms {
                info!(
                    "Suppressing duplicate {} for appId {} (last at {})",
                    alert_type, app_id, recent.created_at
                );
                return None;
            }
        }

        let alert = Alert {
            id: 0,
            app_id,
            alert_type: alert_type.to_string(),
            alert_msg: message,
            alert_level: AlertLevel::Warning,
            created_at: now,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        };

        match self.repository.insert(alert) {
            Ok(stored) => {
                warn!(
                    "Alert created for appId {}: {} - {}",
                    app_id, stored.alert_type, stored.alert_msg
                );
                self.hub.broadcast_alert(&PushEvent::alert(&stored));
                Some(stored)
            }
            Err(e) => {
                // No durable record means no notification either.
                error!("Failed to persist {} alert for appId {}: {}", alert_type, app_id, e);
                None
            }
        }
    }
}
