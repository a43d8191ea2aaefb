//! HTTP client for the collector's registration and ingestion endpoints.
//!
//! Every call carries a bounded timeout; an unresponsive collector must not
//! stall the report timer. Heartbeat and offline are best-effort: failures
//! are logged and swallowed.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{MetricsRequest, RegisterHint, RegisterResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Agent-side failures. Registration failures disable reporting; send
/// failures are per-tick and leave the schedule running.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("http client init failed: {0}")]
    ClientInit(#[source] reqwest::Error),
    #[error("registration request failed: {0}")]
    Registration(#[source] reqwest::Error),
    #[error("registration rejected by collector: HTTP {0}")]
    RegistrationRejected(u16),
    #[error("malformed registration response: {0}")]
    Protocol(String),
    #[error("metrics send failed: {0}")]
    Send(#[source] reqwest::Error),
    #[error("metrics send rejected: HTTP {0}")]
    SendRejected(u16),
}

/// Client for one collector. Holds the process's assigned identity only
/// transiently; the [`super::Reporter`] owns it.
pub struct CollectorClient {
    http: reqwest::Client,
    base_url: String,
}

impl CollectorClient {
    pub fn new(server_url: &str) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(AgentError::ClientInit)?;

        Ok(Self {
            http,
            base_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// Registers the process and returns its assigned identity. A single
    /// attempt: the caller decides what a failure means for reporting.
    pub async fn register(&self, hint: &RegisterHint) -> Result<u64, AgentError> {
        let url = format!("{}/apps/register", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(REGISTER_TIMEOUT)
            .json(hint)
            .send()
            .await
            .map_err(AgentError::Registration)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::RegistrationRejected(status.as_u16()));
        }

        let body: RegisterResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;

        info!("Registered with collector, appId: {}", body.app_id);
        Ok(body.app_id)
    }

    /// Best-effort liveness ping. Failures are logged and otherwise ignored.
    pub async fn heartbeat(&self, app_id: u64) -> bool {
        let url = format!("{}/apps/{}/heartbeat", self.base_url, app_id);

        match self
            .http
            .post(&url)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("Heartbeat failed, HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Heartbeat error: {}", e);
                false
            }
        }
    }

    /// Best-effort deregistration notice. A process that never registered
    /// has nothing to deregister, so `None` is success.
    pub async fn offline(&self, app_id: Option<u64>) -> bool {
        let Some(app_id) = app_id else {
            return true;
        };
        let url = format!("{}/apps/{}/offline", self.base_url, app_id);

        match self
            .http
            .post(&url)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("Sent offline notification");
                true
            }
            Ok(response) => {
                warn!("Offline notification failed, HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Offline notification error: {}", e);
                false
            }
        }
    }

    /// Ships one snapshot to the collector.
    pub async fn send_metrics(
        &self,
        app_id: u64,
        metrics: &HashMap<String, f64>,
    ) -> Result<(), AgentError> {
        let url = format!("{}/metrics", self.base_url);
        let body = MetricsRequest {
            app_id,
            metrics: metrics.clone(),
        };

        let response = self
            .http
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(AgentError::Send)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::SendRejected(status.as_u16()));
        }

        debug!("Metrics reported successfully");
        Ok(())
    }
}
