//! Collector-internal statistics for the /health endpoint.
//!
//! This module provides types and functionality for tracking collector
//! health, including ingestion performance, alerting activity, and HTTP
//! request metrics.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.push_back(Instant::now());
            // Keep only last 10 minutes of timestamps to avoid unbounded growth
            let cutoff = Instant::now() - std::time::Duration::from_secs(600);
            while guard.front().is_some_and(|&t| t < cutoff) {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            let cutoff = Instant::now() - std::time::Duration::from_secs(60);
            guard.iter().filter(|&&t| t >= cutoff).count() as u64
        } else {
            0
        }
    }
}

/// Collector-internal statistics rendered at /health.
pub struct CollectorStats {
    // Pipeline activity
    pub registrations: AtomicU64,
    pub heartbeats: AtomicU64,
    pub offline_notices: AtomicU64,
    pub ingest_accepted: AtomicU64,
    pub ingest_rejected: AtomicU64,
    pub ingest_duration_ms: Stat,

    // Sweeps
    pub liveness_transitions: AtomicU64,
    pub snapshots_deleted: AtomicU64,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,
    pub request_duration_ms: Stat,

    // Timing
    pub start_time: Instant,
}

impl Default for CollectorStats {
    fn default() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
            offline_notices: AtomicU64::new(0),
            ingest_accepted: AtomicU64::new(0),
            ingest_rejected: AtomicU64::new(0),
            ingest_duration_ms: Stat::default(),
            liveness_transitions: AtomicU64::new(0),
            snapshots_deleted: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            request_duration_ms: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl CollectorStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offline_notice(&self) {
        self.offline_notices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingest_accepted(&self, duration_ms: f64) {
        self.ingest_accepted.fetch_add(1, Ordering::Relaxed);
        self.ingest_duration_ms.add_sample(duration_ms);
    }

    pub fn record_ingest_rejected(&self) {
        self.ingest_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_liveness_transitions(&self, count: u64) {
        self.liveness_transitions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_snapshots_deleted(&self, count: u64) {
        self.snapshots_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_request_duration(&self, duration_ms: f64) {
        self.request_duration_ms.add_sample(duration_ms);
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_ingest_accept_rate(&self) -> f64 {
        let accepted = self.ingest_accepted.load(Ordering::Relaxed);
        let rejected = self.ingest_rejected.load(Ordering::Relaxed);
        let total = accepted + rejected;
        if total == 0 {
            100.0
        } else {
            (accepted as f64 / total as f64) * 100.0
        }
    }

    pub fn render_table(&self) -> String {
        let (id_cur, id_avg, id_max, id_min, _) = self.ingest_duration_ms.snapshot();
        let (rd_cur, rd_avg, rd_max, rd_min, _) = self.request_duration_ms.snapshot();

        let registrations = self.registrations.load(Ordering::Relaxed);
        let heartbeats = self.heartbeats.load(Ordering::Relaxed);
        let offline_notices = self.offline_notices.load(Ordering::Relaxed);
        let accepted = self.ingest_accepted.load(Ordering::Relaxed);
        let rejected = self.ingest_rejected.load(Ordering::Relaxed);
        let accept_rate = self.get_ingest_accept_rate();
        let liveness_transitions = self.liveness_transitions.load(Ordering::Relaxed);
        let snapshots_deleted = self.snapshots_deleted.load(Ordering::Relaxed);
        let requests_last_minute = self.http_request_timestamps.count_last_minute();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - COLLECTOR INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();

        writeln!(out, "PIPELINE ACTIVITY").ok();
        writeln!(out, "-----------------").ok();
        writeln!(out, "{:left$} | {}", "registrations", registrations, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "heartbeats", heartbeats, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "offline_notices", offline_notices, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "snapshots_accepted", accepted, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "snapshots_rejected", rejected, left = left_col).ok();
        writeln!(
            out,
            "{:left$} | {:.1}",
            "ingest_accept_rate (%)",
            accept_rate,
            left = left_col
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SWEEPS").ok();
        writeln!(out, "------").ok();
        writeln!(
            out,
            "{:left$} | {}",
            "liveness_transitions",
            liveness_transitions,
            left = left_col
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {}",
            "snapshots_deleted",
            snapshots_deleted,
            left = left_col
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "TIMING").ok();
        writeln!(out, "------").ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "ingest_duration (ms)",
            format!("{:.3}", id_cur),
            format!("{:.3}", id_avg),
            format!("{:.3}", id_max),
            format!("{:.3}", id_min),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "request_duration (ms)",
            format!("{:.3}", rd_cur),
            format!("{:.3}", rd_avg),
            format!("{:.3}", rd_max),
            format!("{:.3}", rd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {}",
            "http_requests_last_minute",
            requests_last_minute,
            left = left_col
        )
        .ok();

        out
    }
}
