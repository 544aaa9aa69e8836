//! Live connection registry.
//!
//! # Responsibilities
//! - Keep the ordered set of live connections
//! - Deliver to one connection or broadcast to all
//! - Prune connections that fail during broadcast
//! - Guarantee removal when a connection task exits, however it exits

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::observability::metrics;
use crate::registry::connection::{ClientId, Connection, ConnectionClosed, ConnectionId};

/// Ordered set of live connections, keyed by [`ConnectionId`].
///
/// The lock is never held across an `.await`: broadcasts iterate a snapshot.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    live: Mutex<Vec<Connection>>,
}

/// Outcome of a broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Connections the message was queued for.
    pub delivered: usize,
    /// Connections that failed; each has been removed from the registry.
    pub failures: Vec<ConnectionClosed>,
}

impl BroadcastReport {
    /// Number of send attempts made.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Identity of one live connection, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: ConnectionId,
    pub client_id: ClientId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the Vec half-updated.
    fn live(&self) -> MutexGuard<'_, Vec<Connection>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection. Connecting the same handle twice is a no-op.
    pub fn connect(&self, conn: Connection) {
        let mut live = self.live();
        if live.iter().any(|c| c.id() == conn.id()) {
            tracing::debug!(connection_id = %conn.id(), "Connection already registered");
            return;
        }
        tracing::debug!(
            connection_id = %conn.id(),
            client_id = %conn.client(),
            "Connection registered"
        );
        live.push(conn);
        metrics::record_ws_connections(live.len());
    }

    /// Remove a connection. Returns false if it was not present.
    pub fn disconnect(&self, conn: &Connection) -> bool {
        let mut live = self.live();
        let before = live.len();
        live.retain(|c| c.id() != conn.id());
        let removed = live.len() != before;
        if removed {
            tracing::debug!(
                connection_id = %conn.id(),
                client_id = %conn.client(),
                "Connection removed"
            );
            metrics::record_ws_connections(live.len());
        }
        removed
    }

    /// Connect and return a guard that disconnects when dropped.
    pub fn register(self: &Arc<Self>, conn: Connection) -> Registration {
        self.connect(conn.clone());
        Registration {
            registry: Arc::clone(self),
            conn,
        }
    }

    /// Deliver a message to exactly one connection.
    pub async fn send(&self, conn: &Connection, message: &str) -> Result<(), ConnectionClosed> {
        conn.send_text(message).await
    }

    /// Deliver a message to every live connection in registry order.
    pub async fn broadcast(&self, message: &str) -> BroadcastReport {
        let targets = self.live().clone();
        let mut report = BroadcastReport::default();

        for conn in &targets {
            match conn.send_text(message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "Broadcast delivery failed, dropping connection");
                    metrics::record_broadcast_failure();
                    self.disconnect(conn);
                    report.failures.push(e);
                }
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }

    /// Live connections in registry order.
    pub fn snapshot(&self) -> Vec<ConnectionInfo> {
        self.live()
            .iter()
            .map(|c| ConnectionInfo {
                connection_id: c.id(),
                client_id: c.client().clone(),
            })
            .collect()
    }
}

/// Keeps a connection registered for as long as it is held.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    conn: Connection,
}

impl Registration {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.disconnect(&self.conn);
    }
}
