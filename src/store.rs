//! Record stores for snapshots and alerts.
//!
//! The storage engine itself is an external concern; the pipeline talks to
//! it through the two repository traits below. The in-memory
//! implementations keep per-app snapshot logs and a flat alert log, which is
//! all the collector needs out of the box.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;

use crate::model::{Alert, MetricSnapshot};

/// Failure while writing to a record store. Logged by callers; a snapshot
/// write failure never blocks alerting or fan-out of that snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store rejected write: {0}")]
    WriteFailed(String),
}

/// Append-and-query store for metric snapshots.
pub trait MetricsRepository: Send + Sync {
    fn append(&self, snapshot: MetricSnapshot) -> Result<(), StoreError>;

    /// Most recent snapshot for a process, if any.
    fn latest(&self, app_id: u64) -> Option<MetricSnapshot>;

    /// History for a process. `since_ms > 0` returns snapshots strictly
    /// newer than `since_ms` in ascending time order; `since_ms = 0` returns
    /// the full history newest-first.
    fn history(&self, app_id: u64, since_ms: i64) -> Vec<MetricSnapshot>;

    /// Deletes snapshots with a timestamp strictly older than `cutoff_ms`.
    /// A snapshot exactly at the cutoff is preserved. Returns the number
    /// deleted.
    fn delete_older_than(&self, cutoff_ms: i64) -> usize;
}

/// Store for alerts. Alerts are never deleted; acknowledged alerts remain
/// as the audit trail.
pub trait AlertRepository: Send + Sync {
    /// Persists an alert, assigning its id. Returns the stored alert.
    fn insert(&self, alert: Alert) -> Result<Alert, StoreError>;

    /// All alerts, newest first.
    fn all(&self) -> Vec<Alert>;

    /// Unacknowledged alerts, newest first.
    fn unacknowledged(&self) -> Vec<Alert>;

    /// Alerts for one process, newest first.
    fn by_app(&self, app_id: u64) -> Vec<Alert>;

    fn unacknowledged_count(&self) -> usize;

    /// Most recent unacknowledged alert of the given type for a process.
    /// This is the dedup-window lookup.
    fn latest_unacknowledged(&self, app_id: u64, alert_type: &str) -> Option<Alert>;

    /// Marks an alert acknowledged. Missing ids and already-acknowledged
    /// alerts are silent no-ops; the first acknowledgement wins.
    fn acknowledge(&self, alert_id: u64, by: &str, at_ms: i64);
}

/// In-memory snapshot store: one append-ordered log per process.
#[derive(Default)]
pub struct InMemoryMetricsRepository {
    by_app: DashMap<u64, Vec<MetricSnapshot>>,
}

impl InMemoryMetricsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsRepository for InMemoryMetricsRepository {
    fn append(&self, snapshot: MetricSnapshot) -> Result<(), StoreError> {
        self.by_app
            .entry(snapshot.app_id)
            .or_default()
            .push(snapshot);
        Ok(())
    }

    fn latest(&self, app_id: u64) -> Option<MetricSnapshot> {
        self.by_app
            .get(&app_id)
            .and_then(|log| log.iter().max_by_key(|s| s.timestamp).cloned())
    }

    fn history(&self, app_id: u64, since_ms: i64) -> Vec<MetricSnapshot> {
        let Some(log) = self.by_app.get(&app_id) else {
            return Vec::new();
        };

        let mut snapshots: Vec<MetricSnapshot> = if since_ms > 0 {
            log.iter().filter(|s| s.timestamp > since_ms).cloned().collect()
        } else {
            log.clone()
        };

        if since_ms > 0 {
            snapshots.sort_by_key(|s| s.timestamp);
        } else {
            snapshots.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        }
        snapshots
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> usize {
        let mut deleted = 0;
        for mut log in self.by_app.iter_mut() {
            let before = log.len();
            log.retain(|s| s.timestamp >= cutoff_ms);
            deleted += before - log.len();
        }
        deleted
    }
}

/// In-memory alert store: a flat log behind one lock plus an id allocator.
pub struct InMemoryAlertRepository {
    alerts: RwLock<Vec<Alert>>,
    next_id: AtomicU64,
}

impl Default for InMemoryAlertRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Alert>> {
        self.alerts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Alert>> {
        self.alerts.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlertRepository for InMemoryAlertRepository {
    fn insert(&self, mut alert: Alert) -> Result<Alert, StoreError> {
        alert.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.write().push(alert.clone());
        Ok(alert)
    }

    fn all(&self) -> Vec<Alert> {
        let mut alerts = self.read().clone();
        alerts.sort_by_key(|a| std::cmp::Reverse((a.created_at, a.id)));
        alerts
    }

    fn unacknowledged(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .read()
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| std::cmp::Reverse((a.created_at, a.id)));
        alerts
    }

    fn by_app(&self, app_id: u64) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .read()
            .iter()
            .filter(|a| a.app_id == app_id)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| std::cmp::Reverse((a.created_at, a.id)));
        alerts
    }

    fn unacknowledged_count(&self) -> usize {
        self.read().iter().filter(|a| !a.acknowledged).count()
    }

    fn latest_unacknowledged(&self, app_id: u64, alert_type: &str) -> Option<Alert> {
        self.read()
            .iter()
            .filter(|a| a.app_id == app_id && !a.acknowledged && a.alert_type == alert_type)
            .max_by_key(|a| (a.created_at, a.id))
            .cloned()
    }

    fn acknowledge(&self, alert_id: u64, by: &str, at_ms: i64) {
        let mut alerts = self.write();
        if let Some(alert) = alerts.iter_mut().find(|a| a.id == alert_id) {
            if !alert.acknowledged {
                alert.acknowledged = true;
                alert.acknowledged_by = Some(by.to_string());
                alert.acknowledged_at = Some(at_ms);
            }
        }
    }
}
