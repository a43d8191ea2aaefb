//! Integration tests for the process-side agent.
//!
//! These tests run the registration client and the reporter against a mock
//! collector and verify the wire protocol, the single-attempt registration
//! discipline, and the tick-overlap guard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use procdoctor::agent::{AgentConfig, AgentError, CollectorClient, Reporter, ReporterState};

fn agent_config(server_url: String) -> AgentConfig {
    AgentConfig {
        server_url,
        app_name: "billing".to_string(),
        host: "10.0.0.5".to_string(),
        port: 8080,
        report_interval: Duration::from_secs(1),
        ..AgentConfig::default()
    }
}

fn fixed_source() -> Arc<dyn procdoctor::agent::MetricSource> {
    Arc::new(|| {
        HashMap::from([
            ("heap.used".to_string(), 512.0),
            ("heap.max".to_string(), 1024.0),
            ("uptime".to_string(), 60_000.0),
        ])
    })
}

async fn mount_register(server: &MockServer, app_id: u64) {
    Mock::given(method("POST"))
        .and(path("/apps/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appId": app_id,
            "status": "running",
            "message": "App registered successfully"
        })))
        .mount(server)
        .await;
}

/// Polls the mock server until `pred` holds for the recorded requests.
async fn wait_for_requests<F>(server: &MockServer, timeout: Duration, pred: F) -> bool
where
    F: Fn(&[wiremock::Request]) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if pred(&requests) {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn count_posts_to(requests: &[wiremock::Request], target: &str) -> usize {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == target)
        .count()
}

#[tokio::test]
async fn test_client_register_parses_assigned_id() {
    let server = MockServer::start().await;
    mount_register(&server, 17).await;

    let client = CollectorClient::new(&server.uri()).unwrap();
    let config = agent_config(server.uri());

    let app_id = client.register(&config.hint()).await.unwrap();
    assert_eq!(app_id, 17);
}

#[tokio::test]
async fn test_client_register_surfaces_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apps/register"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = CollectorClient::new(&server.uri()).unwrap();
    let config = agent_config(server.uri());

    match client.register(&config.hint()).await {
        Err(AgentError::RegistrationRejected(500)) => {}
        other => panic!("expected RegistrationRejected(500), got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_client_heartbeat_is_best_effort() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apps/3/heartbeat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = CollectorClient::new(&server.uri()).unwrap();
    assert!(client.heartbeat(3).await);
    // Unknown route answers 404; the ping reports failure but does not error
    assert!(!client.heartbeat(4).await);
}

#[tokio::test]
async fn test_client_offline_without_registration_is_success() {
    // No server at all: nothing to deregister, nothing to fail
    let client = CollectorClient::new("http://127.0.0.1:9").unwrap();
    assert!(client.offline(None).await);
}

#[tokio::test]
async fn test_reporter_disabled_after_failed_registration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apps/register"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let reporter = Reporter::start(agent_config(server.uri()), fixed_source()).await;

    assert_eq!(reporter.state(), ReporterState::Stopped);
    assert_eq!(reporter.app_id(), None);

    // The report loop never starts
    tokio::time::sleep(Duration::from_millis(300)).await;
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(count_posts_to(&requests, "/metrics"), 0);
}

#[tokio::test]
async fn test_reporter_sends_immediately_then_on_interval() {
    let server = MockServer::start().await;
    mount_register(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "Metrics received"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apps/1/offline"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let reporter = Reporter::start(agent_config(server.uri()), fixed_source()).await;
    assert_eq!(reporter.state(), ReporterState::Reporting);
    assert_eq!(reporter.app_id(), Some(1));

    // The first report fires without waiting for the interval
    assert!(
        wait_for_requests(&server, Duration::from_secs(2), |reqs| {
            count_posts_to(reqs, "/metrics") >= 1
        })
        .await
    );

    // The payload carries the appId and the sampled map
    let requests = server.received_requests().await.unwrap_or_default();
    let body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path() == "/metrics")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(body["appId"], 1);
    assert_eq!(body["metrics"]["heap.used"], 512.0);

    reporter.shutdown().await;

    // Shutdown sent the best-effort offline notice
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(count_posts_to(&requests, "/apps/1/offline"), 1);
}

#[tokio::test]
async fn test_overlap_guard_skips_and_counts_ticks() {
    let server = MockServer::start().await;
    mount_register(&server, 1).await;
    // Sends take longer than the report interval
    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok", "message": "Metrics received"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apps/1/offline"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = AgentConfig {
        allow_overlap: false,
        ..agent_config(server.uri())
    };

    let reporter = Reporter::start(config, fixed_source()).await;
    assert_eq!(reporter.state(), ReporterState::Reporting);

    // First tick is in flight for 5s; at least the ticks at ~1s and ~2s
    // must be skipped, not queued
    tokio::time::sleep(Duration::from_millis(2_600)).await;
    assert!(reporter.skipped_ticks() >= 1);

    reporter.shutdown().await;
}
