//! Process registry: the single owner of registered identities and their
//! liveness state.
//!
//! Registration is idempotent per `(app_name, host, port)` triple. The
//! liveness sweep is the only writer of the `Running -> Offline` transition;
//! the reverse happens only through a fresh `register` or `heartbeat`.
//! Readers may observe a stale `running` for up to one sweep interval.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use crate::model::{now_ms, AppRecord, AppStatus, RegisterHint};

/// Registry of all processes known to the collector. Each record is mutated
/// only through its dashmap entry guard, so per-identity read-modify-write
/// never races.
pub struct ProcessRegistry {
    apps: DashMap<u64, AppRecord>,
    by_triple: DashMap<(String, String, u16), u64>,
    next_id: AtomicU64,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            apps: DashMap::new(),
            by_triple: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a process. If the `(app_name, host, port)` triple is already
    /// known, the existing identifier is reused and only liveness is
    /// refreshed; otherwise a new monotonically increasing id is allocated.
    pub fn register(&self, hint: RegisterHint) -> AppRecord {
        let key = (hint.app_name.clone(), hint.host.clone(), hint.port);
        let now = now_ms();

        match self.by_triple.entry(key) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                let mut app = self
                    .apps
                    .get_mut(&id)
                    .expect("triple index points at a missing app record");
                app.last_heartbeat = now;
                app.status = AppStatus::Running;
                info!("App already registered, refreshing liveness: {}", app.app_name);
                app.clone()
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let record = AppRecord {
                    id,
                    app_name: hint.app_name,
                    host: hint.host,
                    port: hint.port,
                    runtime_name: hint.runtime_name,
                    runtime_version: hint.runtime_version,
                    start_time: hint.start_time,
                    status: AppStatus::Running,
                    registered_at: now,
                    last_heartbeat: now,
                };
                info!("Registering new app: {} (appId={})", record.app_name, id);
                self.apps.insert(id, record.clone());
                slot.insert(id);
                record
            }
        }
    }

    /// Refreshes liveness for a known process. Returns false for ids the
    /// registry has never seen.
    pub fn heartbeat(&self, app_id: u64) -> bool {
        match self.apps.get_mut(&app_id) {
            Some(mut app) => {
                app.last_heartbeat = now_ms();
                app.status = AppStatus::Running;
                true
            }
            None => false,
        }
    }

    /// Marks a process offline. Unknown ids are a no-op; a deregistration
    /// notice for a process that never registered is not an error.
    pub fn offline(&self, app_id: u64) {
        if let Some(mut app) = self.apps.get_mut(&app_id) {
            app.status = AppStatus::Offline;
            info!("App went offline: {}", app.app_name);
        }
    }

    /// Transitions every running process whose last heartbeat is at least
    /// `timeout_ms` old (as of `now`) to offline. Returns the number of
    /// transitions.
    pub fn sweep_liveness_at(&self, now: i64, timeout_ms: i64) -> usize {
        let threshold = now - timeout_ms;
        let mut transitioned = 0;

        for mut app in self.apps.iter_mut() {
            if app.status == AppStatus::Running && app.last_heartbeat <= threshold {
                app.status = AppStatus::Offline;
                transitioned += 1;
                warn!("App heartbeat timeout, marked offline: {}", app.app_name);
            }
        }

        transitioned
    }

    /// Liveness sweep against the current clock.
    pub fn sweep_liveness(&self, timeout_ms: i64) -> usize {
        self.sweep_liveness_at(now_ms(), timeout_ms)
    }

    pub fn get(&self, app_id: u64) -> Option<AppRecord> {
        self.apps.get(&app_id).map(|a| a.clone())
    }

    pub fn contains(&self, app_id: u64) -> bool {
        self.apps.contains_key(&app_id)
    }

    /// All registered processes, newest registration first.
    pub fn all(&self) -> Vec<AppRecord> {
        let mut apps: Vec<AppRecord> = self.apps.iter().map(|a| a.clone()).collect();
        apps.sort_by(|a, b| b.registered_at.cmp(&a.registered_at).then(b.id.cmp(&a.id)));
        apps
    }

    /// Processes currently considered running.
    pub fn running(&self) -> Vec<AppRecord> {
        let mut apps: Vec<AppRecord> = self
            .apps
            .iter()
            .filter(|a| a.status == AppStatus::Running)
            .map(|a| a.clone())
            .collect();
        apps.sort_by_key(|a| a.id);
        apps
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Backdates a process's last heartbeat. Test hook for sweep scenarios.
    #[doc(hidden)]
    pub fn set_last_heartbeat(&self, app_id: u64, at_ms: i64) {
        if let Some(mut app) = self.apps.get_mut(&app_id) {
            app.last_heartbeat = at_ms;
        }
    }
}
