//! Integration tests for the alert engine.
//!
//! These tests verify the threshold rules, the dedup window, acknowledge
//! idempotence, and the persist-before-fanout ordering.

use std::collections::HashMap;
use std::sync::Arc;

use procdoctor::alerts::{AlertConfig, AlertEngine, ALERT_HIGH_CPU_USAGE, ALERT_HIGH_GC_TIME, ALERT_HIGH_HEAP_USAGE};
use procdoctor::fanout::FanoutHub;
use procdoctor::ingest::parse_snapshot;
use procdoctor::model::{Alert, MetricSnapshot};
use procdoctor::store::{AlertRepository, InMemoryAlertRepository, StoreError};

const T0: i64 = 1_700_000_000_000;

fn engine_with(
    repo: Arc<dyn AlertRepository>,
    hub: Arc<FanoutHub>,
) -> AlertEngine {
    AlertEngine::new(AlertConfig::default(), repo, hub)
}

fn snapshot(app_id: u64, pairs: &[(&str, f64)]) -> MetricSnapshot {
    let raw: HashMap<String, f64> = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    parse_snapshot(app_id, T0, &raw)
}

#[test]
fn test_heap_breach_creates_warning_alert() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    let created = engine.evaluate_at(
        T0,
        &snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]),
    );

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].alert_type, ALERT_HIGH_HEAP_USAGE);
    assert_eq!(repo.unacknowledged_count(), 1);
}

#[test]
fn test_heap_at_threshold_does_not_fire() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    let created = engine.evaluate_at(
        T0,
        &snapshot(1, &[("heap.used", 900.0), ("heap.max", 1000.0)]),
    );

    assert!(created.is_empty());
}

#[test]
fn test_absent_cpu_metric_skips_rule() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    // No cpu.load key at all: the CPU rule is skipped, not failed
    let created = engine.evaluate_at(T0, &snapshot(1, &[("system.load", 9.0)]));
    assert!(created.is_empty());

    let created = engine.evaluate_at(T0 + 1, &snapshot(1, &[("cpu.load", 0.95)]));
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].alert_type, ALERT_HIGH_CPU_USAGE);
}

#[test]
fn test_gc_rule_requires_positive_uptime() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    let created = engine.evaluate_at(T0, &snapshot(1, &[("gc.time", 500.0), ("uptime", 0.0)]));
    assert!(created.is_empty());

    let created = engine.evaluate_at(
        T0 + 1,
        &snapshot(1, &[("gc.time", 500.0), ("uptime", 1000.0)]),
    );
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].alert_type, ALERT_HIGH_GC_TIME);
}

#[test]
fn test_one_snapshot_can_create_multiple_alert_types() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    let created = engine.evaluate_at(
        T0,
        &snapshot(
            1,
            &[
                ("heap.used", 990.0),
                ("heap.max", 1000.0),
                ("cpu.load", 0.95),
            ],
        ),
    );

    assert_eq!(created.len(), 2);
}

#[test]
fn test_dedup_window_suppresses_repeat_within_300s() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));
    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);

    assert_eq!(engine.evaluate_at(T0, &breach).len(), 1);
    // 10 seconds later: suppressed
    assert_eq!(engine.evaluate_at(T0 + 10_000, &breach).len(), 0);
    assert_eq!(repo.all().len(), 1);
}

#[test]
fn test_dedup_window_expires_after_300s() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));
    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);

    assert_eq!(engine.evaluate_at(T0, &breach).len(), 1);
    // 400 seconds later: a second alert is created
    assert_eq!(engine.evaluate_at(T0 + 400_000, &breach).len(), 1);
    assert_eq!(repo.all().len(), 2);
}

#[test]
fn test_dedup_is_per_process_and_per_type() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));

    let heap_1 = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);
    let heap_2 = snapshot(2, &[("heap.used", 950.0), ("heap.max", 1000.0)]);
    let cpu_1 = snapshot(1, &[("cpu.load", 0.95)]);

    assert_eq!(engine.evaluate_at(T0, &heap_1).len(), 1);
    // Different process: not suppressed
    assert_eq!(engine.evaluate_at(T0 + 10_000, &heap_2).len(), 1);
    // Same process, different type: not suppressed
    assert_eq!(engine.evaluate_at(T0 + 20_000, &cpu_1).len(), 1);
}

#[test]
fn test_acknowledged_alert_does_not_extend_dedup() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));
    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);

    let first = engine.evaluate_at(T0, &breach);
    engine.acknowledge(first[0].id, "ops");

    // The only alert of this type is acknowledged, so the window no longer
    // applies and a fresh breach alerts again immediately
    assert_eq!(engine.evaluate_at(T0 + 10_000, &breach).len(), 1);
}

#[test]
fn test_acknowledge_is_idempotent() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let engine = engine_with(repo.clone(), Arc::new(FanoutHub::new()));
    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);

    let created = engine.evaluate_at(T0, &breach);
    let id = created[0].id;

    engine.acknowledge(id, "alice");
    engine.acknowledge(id, "bob");
    engine.acknowledge(99_999, "carol");

    let alerts = repo.all();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].acknowledged);
    assert_eq!(alerts[0].acknowledged_by.as_deref(), Some("alice"));
}

#[test]
fn test_created_alert_is_fanned_out() {
    let repo = Arc::new(InMemoryAlertRepository::new());
    let hub = Arc::new(FanoutHub::new());
    let engine = engine_with(repo.clone(), hub.clone());

    let (_conn, mut events) = hub.connect(None);

    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);
    engine.evaluate_at(T0, &breach);

    let payload = events.try_recv().expect("alert event should be queued");
    let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(json["type"], "alert");
    assert_eq!(json["alertType"], ALERT_HIGH_HEAP_USAGE);
    assert_eq!(json["appId"], 1);
}

/// Alert store that rejects every write.
struct FailingAlertRepository;

impl AlertRepository for FailingAlertRepository {
    fn insert(&self, _alert: Alert) -> Result<Alert, StoreError> {
        Err(StoreError::WriteFailed("disk full".into()))
    }
    fn all(&self) -> Vec<Alert> {
        Vec::new()
    }
    fn unacknowledged(&self) -> Vec<Alert> {
        Vec::new()
    }
    fn by_app(&self, _app_id: u64) -> Vec<Alert> {
        Vec::new()
    }
    fn unacknowledged_count(&self) -> usize {
        0
    }
    fn latest_unacknowledged(&self, _app_id: u64, _alert_type: &str) -> Option<Alert> {
        None
    }
    fn acknowledge(&self, _alert_id: u64, _by: &str, _at_ms: i64) {}
}

#[test]
fn test_persist_failure_skips_fanout() {
    let hub = Arc::new(FanoutHub::new());
    let engine = engine_with(Arc::new(FailingAlertRepository), hub.clone());

    let (_conn, mut events) = hub.connect(None);

    let breach = snapshot(1, &[("heap.used", 950.0), ("heap.max", 1000.0)]);
    let created = engine.evaluate_at(T0, &breach);

    // No durable record, no notification
    assert!(created.is_empty());
    assert!(events.try_recv().is_err());
}
