//! Background sweep tasks for the collector.
//!
//! Two independent periodic tasks: the liveness sweep (marks processes
//! offline after heartbeat timeout) and the retention sweep (deletes
//! snapshots past the retention horizon). Each iteration logs failures and
//! continues on the next tick; both stop through the shutdown watch
//! channel.

use anyhow::Result;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use procdoctor::model::now_ms;

use crate::state::SharedState;

/// Spawns the periodic liveness sweep.
pub fn spawn_liveness_sweeper(
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = state.config.liveness_sweep_interval();
    info!(
        "Liveness sweeper started: period={:?}, timeout={}ms",
        period,
        state.config.heartbeat_timeout_ms()
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The immediate first tick would sweep an empty registry; skip it.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = run_liveness_sweep(&state) {
                        error!("Liveness sweep iteration failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Liveness sweeper stopping");
                    break;
                }
            }
        }
    })
}

fn run_liveness_sweep(state: &SharedState) -> Result<()> {
    let start = Instant::now();
    let transitioned = state
        .registry
        .sweep_liveness(state.config.heartbeat_timeout_ms());

    state.stats.record_liveness_transitions(transitioned as u64);
    state
        .metrics
        .liveness_transitions_total
        .inc_by(transitioned as u64);
    state
        .metrics
        .liveness_sweep_duration_seconds
        .set(start.elapsed().as_secs_f64());

    if transitioned > 0 {
        info!("Liveness sweep marked {} app(s) offline", transitioned);
    } else {
        debug!("Liveness sweep found no timeouts");
    }
    Ok(())
}

/// Spawns the periodic retention sweep.
pub fn spawn_retention_sweeper(
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = state.config.retention_sweep_interval();
    info!(
        "Retention sweeper started: period={:?}, horizon={}ms",
        period,
        state.config.retention_horizon_ms()
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = run_retention_sweep(&state) {
                        error!("Retention sweep iteration failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Retention sweeper stopping");
                    break;
                }
            }
        }
    })
}

fn run_retention_sweep(state: &SharedState) -> Result<()> {
    let start = Instant::now();
    let cutoff = now_ms() - state.config.retention_horizon_ms();
    let deleted = state.metrics_repo.delete_older_than(cutoff);

    state.stats.record_snapshots_deleted(deleted as u64);
    state.metrics.retention_deleted_total.inc_by(deleted as u64);
    state
        .metrics
        .retention_sweep_duration_seconds
        .set(start.elapsed().as_secs_f64());

    info!(
        "Retention sweep deleted {} snapshot(s) older than {}",
        deleted, cutoff
    );
    Ok(())
}
