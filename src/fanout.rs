//! Fan-out hub for live observers.
//!
//! The hub keeps two indexes: every active connection, and at most one
//! connection scoped to each process (a later scoped connection silently
//! replaces the former in that index). Delivery is best-effort per
//! connection; a failed send drops only that connection and never aborts
//! delivery to the rest.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::model::PushEvent;

/// Identifier for one observer connection, unique for the hub's lifetime.
pub type ConnectionId = u64;

struct Connection {
    app_id: Option<u64>,
    tx: mpsc::UnboundedSender<String>,
}

/// Outcome of one broadcast: how many observers received the event and how
/// many dead connections were dropped along the way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

/// Hub over all live observer connections.
#[derive(Default)]
pub struct FanoutHub {
    sessions: DashMap<ConnectionId, Connection>,
    app_sessions: DashMap<u64, ConnectionId>,
    next_id: AtomicU64,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer, optionally scoped to one process. Returns the
    /// connection id and the receiving end the transport task drains.
    pub fn connect(
        &self,
        app_id: Option<u64>,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.sessions.insert(id, Connection { app_id, tx });
        if let Some(app_id) = app_id {
            // A newer scoped connection silently takes over the slot.
            self.app_sessions.insert(app_id, id);
            info!("Observer connected: connection={} appId={}", id, app_id);
        } else {
            info!("Observer connected: connection={} (broadcast)", id);
        }

        (id, rx)
    }

    /// Removes an observer. The scoped slot is released only if it still
    /// points at this connection.
    pub fn disconnect(&self, id: ConnectionId) {
        if let Some((_, conn)) = self.sessions.remove(&id) {
            if let Some(app_id) = conn.app_id {
                self.app_sessions
                    .remove_if(&app_id, |_, scoped| *scoped == id);
            }
            info!("Observer disconnected: connection={}", id);
        }
    }

    /// Delivers a metrics event to every connection.
    pub fn broadcast_metrics(&self, event: &PushEvent) -> BroadcastOutcome {
        self.broadcast(event)
    }

    /// Delivers an alert event to every connection.
    pub fn broadcast_alert(&self, event: &PushEvent) -> BroadcastOutcome {
        self.broadcast(event)
    }

    /// Delivers an event only to the connection scoped to `app_id`, if one
    /// exists. Returns whether the event was delivered.
    pub fn send_to_process(&self, app_id: u64, event: &PushEvent) -> bool {
        let Some(scoped) = self.app_sessions.get(&app_id).map(|id| *id) else {
            return false;
        };
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode push event: {}", e);
                return false;
            }
        };

        let sent = self
            .sessions
            .get(&scoped)
            .map(|conn| conn.tx.send(payload).is_ok())
            .unwrap_or(false);

        if !sent {
            debug!("Scoped observer for appId={} is gone, dropping", app_id);
            self.disconnect(scoped);
        }
        sent
    }

    fn broadcast(&self, event: &PushEvent) -> BroadcastOutcome {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode push event: {}", e);
                return BroadcastOutcome::default();
            }
        };

        // Snapshot the ids first so connects/disconnects during delivery
        // never stall or skip the iteration.
        let ids: Vec<ConnectionId> = self.sessions.iter().map(|c| *c.key()).collect();
        let mut outcome = BroadcastOutcome::default();

        for id in ids {
            let sent = self
                .sessions
                .get(&id)
                .map(|conn| conn.tx.send(payload.clone()).is_ok());
            match sent {
                Some(true) => outcome.delivered += 1,
                Some(false) => {
                    warn!("Failed to deliver to connection {}, dropping it", id);
                    self.disconnect(id);
                    outcome.dropped += 1;
                }
                None => {} // already disconnected mid-broadcast
            }
        }

        outcome
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a scoped observer exists for the process.
    pub fn has_process_observer(&self, app_id: u64) -> bool {
        self.app_sessions.contains_key(&app_id)
    }

    /// Connection currently holding the scoped slot for the process.
    pub fn scoped_connection(&self, app_id: u64) -> Option<ConnectionId> {
        self.app_sessions.get(&app_id).map(|id| *id)
    }
}
