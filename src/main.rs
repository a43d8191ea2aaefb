//! procdoctor - version 0.1.0
//!
//! Telemetry collector for fleets of long-running processes.
//! This is the main entry point that initializes the server and the
//! background sweep tasks.

mod cli;
mod config;
mod handlers;
mod metrics;
mod state;
mod stats;
mod sweeper;

use axum::{
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{debug, error, info, Level};

use procdoctor::alerts::AlertEngine;
use procdoctor::fanout::FanoutHub;
use procdoctor::ingest::IngestionService;
use procdoctor::registry::ProcessRegistry;
use procdoctor::store::{
    AlertRepository, InMemoryAlertRepository, InMemoryMetricsRepository, MetricsRepository,
};

use cli::{Args, LogLevel};
use config::{
    resolve_config, show_config, validate_effective_config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{
    acknowledge_alert_handler, alert_stats_handler, alerts_by_app_handler, alerts_handler,
    all_latest_handler, app_handler, apps_handler, health_handler, heartbeat_handler,
    history_handler, ingest_batch_handler, ingest_handler, internal_metrics_handler,
    latest_handler, offline_handler, register_handler, root_handler, running_apps_handler,
    unacknowledged_alerts_handler, ws_handler,
};
use metrics::CollectorMetrics;
use state::{AppState, SharedState};
use stats::CollectorStats;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Load configuration for server mode
    let config = resolve_config(&args)?;

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&args);

    info!("Starting procdoctor collector");

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    // Initialize Prometheus self-telemetry
    let prom_registry = Registry::new();
    let collector_metrics = CollectorMetrics::new(&prom_registry)?;
    debug!("Prometheus registry initialized");

    // Assemble the pipeline core
    let registry = Arc::new(ProcessRegistry::new());
    let metrics_repo: Arc<dyn MetricsRepository> = Arc::new(InMemoryMetricsRepository::new());
    let alert_repo: Arc<dyn AlertRepository> = Arc::new(InMemoryAlertRepository::new());
    let hub = Arc::new(FanoutHub::new());
    let alert_engine = Arc::new(AlertEngine::new(
        config.alert_config(),
        alert_repo.clone(),
        hub.clone(),
    ));
    let ingestion = IngestionService::new(
        registry.clone(),
        metrics_repo.clone(),
        alert_engine.clone(),
        hub.clone(),
    );

    let state: SharedState = Arc::new(AppState {
        registry,
        metrics_repo,
        alert_repo,
        alert_engine,
        ingestion,
        hub,
        config: Arc::new(config.clone()),
        stats: Arc::new(CollectorStats::new()),
        prom_registry,
        metrics: collector_metrics,
        start_time: Instant::now(),
    });

    // Start background sweeps with a shared shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let liveness_task = sweeper::spawn_liveness_sweeper(state.clone(), shutdown_rx.clone());
    let retention_task = sweeper::spawn_retention_sweeper(state.clone(), shutdown_rx);

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/apps/register", post(register_handler))
        .route("/apps", get(apps_handler))
        .route("/apps/running", get(running_apps_handler))
        .route("/apps/{app_id}", get(app_handler))
        .route("/apps/{app_id}/heartbeat", post(heartbeat_handler))
        .route("/apps/{app_id}/offline", post(offline_handler))
        .route("/metrics", post(ingest_handler))
        .route("/metrics/batch", post(ingest_batch_handler))
        .route("/metrics/all/latest", get(all_latest_handler))
        .route("/metrics/{app_id}/latest", get(latest_handler))
        .route("/metrics/{app_id}/history", get(history_handler))
        .route("/alerts", get(alerts_handler))
        .route("/alerts/unacknowledged", get(unacknowledged_alerts_handler))
        .route("/alerts/stats", get(alert_stats_handler))
        .route("/alerts/app/{app_id}", get(alerts_by_app_handler))
        .route("/alerts/{alert_id}/acknowledge", post(acknowledge_alert_handler))
        .route("/ws/metrics", get(ws_handler))
        .route("/internal/metrics", get(internal_metrics_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    let app = app.with_state(state.clone());

    // Check if TLS is enabled
    let enable_tls = config.enable_tls.unwrap_or(false);

    if enable_tls {
        // TLS is enabled - use axum_server with rustls
        // These paths are guaranteed to exist since validate_effective_config() was called earlier
        let cert_path = config
            .tls_cert_path
            .as_ref()
            .expect("tls_cert_path should be set when enable_tls is true (validated at startup)");
        let key_path = config
            .tls_key_path
            .as_ref()
            .expect("tls_key_path should be set when enable_tls is true (validated at startup)");

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!("procdoctor listening on https://{}:{}", bind_ip_str, port);

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        // TLS is disabled - use standard TCP listener
        let listener = TcpListener::bind(addr).await?;
        info!("procdoctor listening on http://{}:{}", bind_ip_str, port);

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal => {
                info!("Shutdown signal received, exiting...");
            }
        }
    }

    // Stop the sweep tasks before exiting
    let _ = shutdown_tx.send(true);
    let _ = liveness_task.await;
    let _ = retention_task.await;

    info!("procdoctor stopped gracefully");
    Ok(())
}
