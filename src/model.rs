//! Domain records and wire types for the telemetry pipeline.
//!
//! Everything that crosses the agent/collector boundary or is persisted by a
//! repository lives here, as serde types validated at the boundary.

use serde::{Deserialize, Serialize};

/// Current epoch time in milliseconds, the timestamp unit used on the wire
/// and in all persisted records.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Liveness status of a registered process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Running,
    Offline,
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppStatus::Running => write!(f, "running"),
            AppStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Identity hint sent by a process when it registers. Also the wire body of
/// `POST /apps/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHint {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub runtime_name: String,
    pub runtime_version: String,
    /// Process start time, epoch milliseconds.
    pub start_time: i64,
}

/// A registered process as tracked by the registry: the assigned identity
/// plus its mutable liveness state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub id: u64,
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub runtime_name: String,
    pub runtime_version: String,
    pub start_time: i64,
    pub status: AppStatus,
    pub registered_at: i64,
    pub last_heartbeat: i64,
}

/// One timestamped health sample for a process, parsed from the flat wire
/// map at ingestion. Immutable once stored; `heap_usage` is derived exactly
/// once at ingestion and never recomputed downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub app_id: u64,
    /// Ingestion time, epoch milliseconds (send time is not trusted).
    pub timestamp: i64,
    pub heap_used: Option<u64>,
    pub heap_max: Option<u64>,
    pub heap_usage: Option<f64>,
    pub nonheap_used: Option<u64>,
    pub gc_count: Option<u64>,
    pub gc_time: Option<u64>,
    pub thread_count: Option<u32>,
    pub daemon_thread_count: Option<u32>,
    pub cpu_usage: Option<f64>,
    pub system_load: Option<f64>,
    pub uptime: Option<u64>,
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

/// One detected threshold breach. Created by the alert engine, mutated only
/// by acknowledge, never deleted by retention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: u64,
    pub app_id: u64,
    pub alert_type: String,
    pub alert_msg: String,
    pub alert_level: AlertLevel,
    pub created_at: i64,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<i64>,
}

/// Event pushed to live observers over the WebSocket channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    #[serde(rename = "metrics", rename_all = "camelCase")]
    Metrics {
        app_id: u64,
        timestamp: i64,
        heap_used: u64,
        heap_max: u64,
        heap_usage: f64,
        gc_count: u64,
        gc_time: u64,
        thread_count: u32,
        cpu_usage: f64,
        system_load: f64,
        uptime: u64,
    },
    #[serde(rename = "alert", rename_all = "camelCase")]
    Alert {
        alert_id: u64,
        app_id: u64,
        alert_type: String,
        alert_msg: String,
        alert_level: AlertLevel,
        created_at: i64,
    },
}

impl PushEvent {
    /// Metrics event for a stored snapshot. Absent metrics are pushed as
    /// zeros so the event shape stays fixed for observers.
    pub fn metrics(snapshot: &MetricSnapshot) -> Self {
        PushEvent::Metrics {
            app_id: snapshot.app_id,
            timestamp: snapshot.timestamp,
            heap_used: snapshot.heap_used.unwrap_or(0),
            heap_max: snapshot.heap_max.unwrap_or(0),
            heap_usage: snapshot.heap_usage.unwrap_or(0.0),
            gc_count: snapshot.gc_count.unwrap_or(0),
            gc_time: snapshot.gc_time.unwrap_or(0),
            thread_count: snapshot.thread_count.unwrap_or(0),
            cpu_usage: snapshot.cpu_usage.unwrap_or(0.0),
            system_load: snapshot.system_load.unwrap_or(0.0),
            uptime: snapshot.uptime.unwrap_or(0),
        }
    }

    pub fn alert(alert: &Alert) -> Self {
        PushEvent::Alert {
            alert_id: alert.id,
            app_id: alert.app_id,
            alert_type: alert.alert_type.clone(),
            alert_msg: alert.alert_msg.clone(),
            alert_level: alert.alert_level,
            created_at: alert.created_at,
        }
    }
}

/// Wire response of `POST /apps/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub app_id: u64,
    pub status: AppStatus,
    pub message: String,
}

/// Wire body of `POST /metrics`; the batch variant takes an array of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    pub app_id: u64,
    /// Flat metric key to numeric value map, e.g. `heap.used`, `gc.time`.
    pub metrics: std::collections::HashMap<String, f64>,
}

/// Generic `{status, message}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
        }
    }
}
