//! Integration tests for the ingestion service.
//!
//! These tests verify unknown-identity rejection, derived-field
//! computation, the implicit heartbeat, and the independence of the
//! persist / alert / publish side effects.

use std::collections::HashMap;
use std::sync::Arc;

use procdoctor::alerts::{AlertConfig, AlertEngine};
use procdoctor::fanout::FanoutHub;
use procdoctor::ingest::{IngestError, IngestionService};
use procdoctor::model::{MetricSnapshot, RegisterHint};
use procdoctor::registry::ProcessRegistry;
use procdoctor::store::{
    AlertRepository, InMemoryAlertRepository, InMemoryMetricsRepository, MetricsRepository,
    StoreError,
};

struct Pipeline {
    registry: Arc<ProcessRegistry>,
    metrics_repo: Arc<InMemoryMetricsRepository>,
    alert_repo: Arc<InMemoryAlertRepository>,
    hub: Arc<FanoutHub>,
    ingestion: IngestionService,
}

fn pipeline() -> Pipeline {
    let registry = Arc::new(ProcessRegistry::new());
    let metrics_repo = Arc::new(InMemoryMetricsRepository::new());
    let alert_repo = Arc::new(InMemoryAlertRepository::new());
    let hub = Arc::new(FanoutHub::new());
    let engine = Arc::new(AlertEngine::new(
        AlertConfig::default(),
        alert_repo.clone() as Arc<dyn AlertRepository>,
        hub.clone(),
    ));
    let ingestion = IngestionService::new(
        registry.clone(),
        metrics_repo.clone() as Arc<dyn MetricsRepository>,
        engine,
        hub.clone(),
    );

    Pipeline {
        registry,
        metrics_repo,
        alert_repo,
        hub,
        ingestion,
    }
}

fn register(registry: &ProcessRegistry, name: &str) -> u64 {
    registry
        .register(RegisterHint {
            app_name: name.to_string(),
            host: "10.0.0.1".to_string(),
            port: 8080,
            runtime_name: "rust".to_string(),
            runtime_version: "1.80".to_string(),
            start_time: 1_700_000_000_000,
        })
        .id
}

fn raw(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_unknown_identity_is_rejected_with_no_side_effects() {
    let p = pipeline();
    let (_conn, mut events) = p.hub.connect(None);

    let result = p
        .ingestion
        .ingest(42, &raw(&[("heap.used", 950.0), ("heap.max", 1000.0)]));

    assert!(matches!(result, Err(IngestError::UnknownApp(42))));
    assert!(p.metrics_repo.latest(42).is_none());
    assert!(p.alert_repo.all().is_empty());
    assert!(events.try_recv().is_err());
}

#[test]
fn test_accepted_snapshot_is_persisted_with_derived_heap_usage() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");

    let stored = p
        .ingestion
        .ingest(app_id, &raw(&[("heap.used", 900.0), ("heap.max", 1000.0)]))
        .unwrap();

    assert_eq!(stored.heap_usage, Some(0.9));
    let persisted = p.metrics_repo.latest(app_id).unwrap();
    assert_eq!(persisted, stored);
}

#[test]
fn test_heap_max_zero_never_divides() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");

    let stored = p
        .ingestion
        .ingest(app_id, &raw(&[("heap.used", 900.0), ("heap.max", 0.0)]))
        .unwrap();

    assert_eq!(stored.heap_usage, Some(0.0));
}

#[test]
fn test_ingest_refreshes_heartbeat() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");

    let before = p.registry.get(app_id).unwrap().last_heartbeat;
    p.registry.set_last_heartbeat(app_id, before - 60_000);

    p.ingestion
        .ingest(app_id, &raw(&[("uptime", 1000.0)]))
        .unwrap();

    assert!(p.registry.get(app_id).unwrap().last_heartbeat >= before);
}

#[test]
fn test_ingest_publishes_metrics_event() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");
    let (_conn, mut events) = p.hub.connect(None);

    p.ingestion
        .ingest(app_id, &raw(&[("heap.used", 100.0), ("heap.max", 1000.0)]))
        .unwrap();

    let payload = events.try_recv().expect("metrics event should be queued");
    let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(json["type"], "metrics");
    assert_eq!(json["appId"], app_id);
    assert_eq!(json["heapUsage"], 0.1);
}

#[test]
fn test_breaching_snapshot_creates_alert_during_ingest() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");

    p.ingestion
        .ingest(app_id, &raw(&[("heap.used", 950.0), ("heap.max", 1000.0)]))
        .unwrap();

    let alerts = p.alert_repo.by_app(app_id);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, "high_heap_usage");
}

/// Snapshot store that rejects every write.
struct FailingMetricsRepository;

impl MetricsRepository for FailingMetricsRepository {
    fn append(&self, _snapshot: MetricSnapshot) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed("disk full".into()))
    }
    fn latest(&self, _app_id: u64) -> Option<MetricSnapshot> {
        None
    }
    fn history(&self, _app_id: u64, _since_ms: i64) -> Vec<MetricSnapshot> {
        Vec::new()
    }
    fn delete_older_than(&self, _cutoff_ms: i64) -> usize {
        0
    }
}

#[test]
fn test_persistence_failure_still_alerts_and_publishes() {
    let registry = Arc::new(ProcessRegistry::new());
    let alert_repo = Arc::new(InMemoryAlertRepository::new());
    let hub = Arc::new(FanoutHub::new());
    let engine = Arc::new(AlertEngine::new(
        AlertConfig::default(),
        alert_repo.clone() as Arc<dyn AlertRepository>,
        hub.clone(),
    ));
    let ingestion = IngestionService::new(
        registry.clone(),
        Arc::new(FailingMetricsRepository),
        engine,
        hub.clone(),
    );

    let app_id = register(&registry, "billing");
    let (_conn, mut events) = hub.connect(None);

    let result = ingestion.ingest(app_id, &raw(&[("heap.used", 950.0), ("heap.max", 1000.0)]));

    // The call reports the persistence failure...
    assert!(matches!(result, Err(IngestError::Persistence(_))));
    // ...but the alert was still evaluated and both events still published
    assert_eq!(alert_repo.by_app(app_id).len(), 1);
    let mut kinds = Vec::new();
    while let Ok(payload) = events.try_recv() {
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        kinds.push(json["type"].as_str().unwrap().to_string());
    }
    assert!(kinds.contains(&"alert".to_string()));
    assert!(kinds.contains(&"metrics".to_string()));
    // The heartbeat was refreshed regardless
    assert!(registry.get(app_id).is_some());
}

#[test]
fn test_scoped_observer_receives_broadcasts_once() {
    let p = pipeline();
    let app_id = register(&p.registry, "billing");
    let other_id = register(&p.registry, "checkout");

    let (_conn, mut scoped_events) = p.hub.connect(Some(app_id));

    p.ingestion
        .ingest(other_id, &raw(&[("uptime", 1.0)]))
        .unwrap();
    p.ingestion
        .ingest(app_id, &raw(&[("uptime", 2.0)]))
        .unwrap();

    // The scoped connection sits in the broadcast set: one event per
    // ingested snapshot, never a duplicate for its own process.
    let mut seen = Vec::new();
    while let Ok(payload) = scoped_events.try_recv() {
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        seen.push(json["appId"].as_u64().unwrap());
    }
    assert_eq!(seen.len(), 2);
    assert!(seen.contains(&app_id));
    assert!(seen.contains(&other_id));
}
