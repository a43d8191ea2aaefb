//! The report loop: `Idle -> Registering -> Reporting -> Stopped`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::client::CollectorClient;
use super::config::AgentConfig;
use super::source::MetricSource;

/// Lifecycle of the reporter. `Idle` is the state before `start` is called;
/// a reporter handle is only ever observed in the last two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    Registering,
    Reporting,
    Stopped,
}

/// Drives periodic sample-and-send against one collector.
///
/// Registration is attempted exactly once, at start. On failure the
/// reporter transitions straight to `Stopped` and the report loop never
/// starts; the failure surfaces as a one-time diagnostic, never a crash.
/// Adding a retry policy would change observable behavior (a
/// never-reporting process vs an eventually-reporting one), so none is
/// layered on here.
pub struct Reporter {
    client: Option<Arc<CollectorClient>>,
    config: AgentConfig,
    state: Arc<Mutex<ReporterState>>,
    app_id: Option<u64>,
    skipped_ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Reporter {
    /// Registers and, on success, starts the report loop: one immediate
    /// sample+send, then one per interval. Ticks are time-driven, not
    /// completion-driven; with `allow_overlap` a slow send from tick N may
    /// still be in flight when tick N+1 fires, otherwise such ticks are
    /// skipped and counted.
    pub async fn start(config: AgentConfig, source: Arc<dyn MetricSource>) -> Reporter {
        let state = Arc::new(Mutex::new(ReporterState::Registering));
        let skipped_ticks = Arc::new(AtomicU64::new(0));

        let mut reporter = Reporter {
            client: None,
            config,
            state,
            app_id: None,
            skipped_ticks,
            task: None,
        };

        let client = match CollectorClient::new(&reporter.config.server_url) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!("Failed to initialize collector client: {} - reporting disabled", e);
                reporter.set_state(ReporterState::Stopped);
                return reporter;
            }
        };
        reporter.client = Some(client.clone());

        let app_id = match client.register(&reporter.config.hint()).await {
            Ok(app_id) => app_id,
            Err(e) => {
                error!("Failed to register app, metrics reporting disabled: {}", e);
                reporter.set_state(ReporterState::Stopped);
                return reporter;
            }
        };
        reporter.app_id = Some(app_id);

        reporter.set_state(ReporterState::Reporting);
        info!(
            "Starting report loop with interval: {:?}",
            reporter.config.effective_interval()
        );

        reporter.task = Some(tokio::spawn(report_loop(
            client,
            source,
            app_id,
            reporter.config.clone(),
            reporter.skipped_ticks.clone(),
        )));

        reporter
    }

    pub fn state(&self) -> ReporterState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Identity assigned at registration, if registration succeeded.
    pub fn app_id(&self) -> Option<u64> {
        self.app_id
    }

    /// Ticks skipped by the no-overlap guard.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Best-effort liveness ping outside the report schedule.
    pub async fn heartbeat(&self) -> bool {
        match (&self.client, self.app_id) {
            (Some(client), Some(app_id)) => client.heartbeat(app_id).await,
            _ => false,
        }
    }

    /// Sends the best-effort offline notice, bounded by the configured
    /// grace period, then tears the report loop down. An in-flight send is
    /// not cancelled; it completes or times out on its own.
    pub async fn shutdown(mut self) {
        if let Some(client) = &self.client {
            let grace = self.config.shutdown_grace;
            if tokio::time::timeout(grace, client.offline(self.app_id))
                .await
                .is_err()
            {
                warn!("Offline notice did not finish within {:?}, abandoning", grace);
            }
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.set_state(ReporterState::Stopped);
        info!("Reporter stopped");
    }

    fn set_state(&self, next: ReporterState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = next;
    }
}

async fn report_loop(
    client: Arc<CollectorClient>,
    source: Arc<dyn MetricSource>,
    app_id: u64,
    config: AgentConfig,
    skipped_ticks: Arc<AtomicU64>,
) {
    let mut interval = tokio::time::interval(config.effective_interval());
    let in_flight = Arc::new(AtomicBool::new(false));

    loop {
        // First tick completes immediately, giving the initial report.
        interval.tick().await;

        let metrics = source.sample();

        if !config.allow_overlap
            && in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            skipped_ticks.fetch_add(1, Ordering::Relaxed);
            debug!("Previous send still in flight, skipping tick");
            continue;
        }

        let client = client.clone();
        let in_flight = in_flight.clone();
        let guard = !config.allow_overlap;
        tokio::spawn(async move {
            if let Err(e) = client.send_metrics(app_id, &metrics).await {
                warn!("Failed to report metrics: {}", e);
            }
            if guard {
                in_flight.store(false, Ordering::Release);
            }
        });
    }
}
