//! Agent configuration.

use std::time::Duration;

use crate::model::{now_ms, RegisterHint};

/// Minimum report interval. Ticks faster than this are clamped.
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the in-process agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the collector, e.g. `http://localhost:9610`.
    pub server_url: String,
    /// Logical name of the monitored process.
    pub app_name: String,
    /// Host the monitored process serves on.
    pub host: String,
    /// Port the monitored process serves on (0 if it serves nothing).
    pub port: u16,
    /// Runtime name reported at registration.
    pub runtime_name: String,
    /// Runtime version reported at registration.
    pub runtime_version: String,
    /// Process start time, epoch milliseconds.
    pub start_time: i64,
    /// Interval between report ticks. Clamped to [`MIN_REPORT_INTERVAL`].
    pub report_interval: Duration,
    /// Whether a tick may fire while the previous send is still in flight.
    /// When false, such ticks are skipped and counted instead.
    pub allow_overlap: bool,
    /// Grace period for the best-effort offline notice at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9610".to_string(),
            app_name: String::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
            runtime_name: "rust".to_string(),
            runtime_version: "unknown".to_string(),
            start_time: now_ms(),
            report_interval: Duration::from_secs(30),
            allow_overlap: true,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Effective report interval after clamping.
    pub fn effective_interval(&self) -> Duration {
        self.report_interval.max(MIN_REPORT_INTERVAL)
    }

    /// Identity hint sent at registration.
    pub fn hint(&self) -> RegisterHint {
        RegisterHint {
            app_name: self.app_name.clone(),
            host: self.host.clone(),
            port: self.port,
            runtime_name: self.runtime_name.clone(),
            runtime_version: self.runtime_version.clone(),
            start_time: self.start_time,
        }
    }
}
