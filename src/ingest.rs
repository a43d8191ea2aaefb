//! Snapshot ingestion: the collector-side entry point of the pipeline.
//!
//! One `ingest` call does all of: boundary parse of the flat metric map,
//! derived-field computation, persistence, implicit heartbeat, synchronous
//! alert evaluation, and synchronous fan-out. A persistence failure is
//! logged and reported to the caller but does not block the alert check or
//! the publish for that snapshot.

use ahash::AHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::alerts::AlertEngine;
use crate::fanout::FanoutHub;
use crate::model::{now_ms, MetricSnapshot, PushEvent};
use crate::registry::ProcessRegistry;
use crate::store::{MetricsRepository, StoreError};

/// Ingestion failure visible to the reporting process.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The id was never registered (or the registry has been rebuilt since).
    /// A hard rejection, surfaced as a non-200 to the sender.
    #[error("unknown appId {0}, register first")]
    UnknownApp(u64),
    /// The snapshot could not be persisted. Alerting and fan-out for the
    /// snapshot still ran.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

pub struct IngestionService {
    registry: Arc<ProcessRegistry>,
    repository: Arc<dyn MetricsRepository>,
    alert_engine: Arc<AlertEngine>,
    hub: Arc<FanoutHub>,
}

impl IngestionService {
    pub fn new(
        registry: Arc<ProcessRegistry>,
        repository: Arc<dyn MetricsRepository>,
        alert_engine: Arc<AlertEngine>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            registry,
            repository,
            alert_engine,
            hub,
        }
    }

    /// Ingests one raw snapshot for a registered process. On acceptance the
    /// stored snapshot is returned; its `timestamp` is the ingestion time.
    pub fn ingest(
        &self,
        app_id: u64,
        raw: &HashMap<String, f64>,
    ) -> Result<MetricSnapshot, IngestError> {
        if !self.registry.contains(app_id) {
            return Err(IngestError::UnknownApp(app_id));
        }

        let snapshot = parse_snapshot(app_id, now_ms(), raw);

        let persisted = self.repository.append(snapshot.clone());
        if let Err(ref e) = persisted {
            error!("Failed to persist snapshot for appId {}: {}", app_id, e);
        }

        // Every accepted snapshot doubles as a heartbeat.
        self.registry.heartbeat(app_id);

        self.alert_engine.evaluate(&snapshot);
        self.hub.broadcast_metrics(&PushEvent::metrics(&snapshot));

        debug!("Ingested snapshot for appId {}", app_id);
        persisted?;
        Ok(snapshot)
    }
}

fn get_u64(raw: &AHashMap<&str, f64>, key: &str) -> Option<u64> {
    raw.get(key).map(|v| if *v < 0.0 { 0 } else { *v as u64 })
}

fn get_u32(raw: &AHashMap<&str, f64>, key: &str) -> Option<u32> {
    raw.get(key).map(|v| if *v < 0.0 { 0 } else { *v as u32 })
}

fn get_f64(raw: &AHashMap<&str, f64>, key: &str) -> Option<f64> {
    raw.get(key).copied()
}

/// Parses the flat wire map into a typed snapshot and derives computed
/// fields. `heap_usage` is `heap_used / heap_max` when `heap_max > 0` and
/// `0.0` when heap data is present with `heap_max = 0` (never a division
/// error); it stays absent when no heap data was reported.
pub fn parse_snapshot(app_id: u64, timestamp: i64, raw: &HashMap<String, f64>) -> MetricSnapshot {
    let raw: AHashMap<&str, f64> = raw.iter().map(|(k, v)| (k.as_str(), *v)).collect();

    let heap_used = get_u64(&raw, "heap.used");
    let heap_max = get_u64(&raw, "heap.max");
    let heap_usage = heap_used.map(|used| match heap_max {
        Some(max) if max > 0 => used as f64 / max as f64,
        _ => 0.0,
    });

    MetricSnapshot {
        app_id,
        timestamp,
        heap_used,
        heap_max,
        heap_usage,
        nonheap_used: get_u64(&raw, "nonheap.used"),
        gc_count: get_u64(&raw, "gc.count"),
        gc_time: get_u64(&raw, "gc.time"),
        thread_count: get_u32(&raw, "thread.count"),
        daemon_thread_count: get_u32(&raw, "thread.daemon"),
        cpu_usage: get_f64(&raw, "cpu.load"),
        system_load: get_f64(&raw, "system.load"),
        uptime: get_u64(&raw, "uptime"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_heap_usage_derivation() {
        let snapshot = parse_snapshot(
            1,
            1000,
            &raw(&[("heap.used", 900.0), ("heap.max", 1000.0)]),
        );
        assert_eq!(snapshot.heap_usage, Some(0.9));
    }

    #[test]
    fn test_heap_max_zero_defaults_to_zero_usage() {
        let snapshot =
            parse_snapshot(1, 1000, &raw(&[("heap.used", 900.0), ("heap.max", 0.0)]));
        assert_eq!(snapshot.heap_usage, Some(0.0));
    }

    #[test]
    fn test_absent_heap_stays_absent() {
        let snapshot = parse_snapshot(1, 1000, &raw(&[("cpu.load", 0.5)]));
        assert_eq!(snapshot.heap_usage, None);
        assert_eq!(snapshot.cpu_usage, Some(0.5));
    }

    #[test]
    fn test_counts_and_gauges_map_to_their_fields() {
        let snapshot = parse_snapshot(
            3,
            2000,
            &raw(&[
                ("gc.count", 12.0),
                ("gc.time", 340.0),
                ("thread.count", 41.0),
                ("thread.daemon", 7.0),
                ("system.load", 2.25),
                ("uptime", 86_400_000.0),
            ]),
        );

        assert_eq!(snapshot.gc_count, Some(12));
        assert_eq!(snapshot.gc_time, Some(340));
        assert_eq!(snapshot.thread_count, Some(41));
        assert_eq!(snapshot.daemon_thread_count, Some(7));
        assert_eq!(snapshot.system_load, Some(2.25));
        assert_eq!(snapshot.uptime, Some(86_400_000));
        assert_eq!(snapshot.timestamp, 2000);
    }
}
