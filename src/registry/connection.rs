//! Duplex connection handles.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing and registry membership
//! - Carry the caller-assigned client identifier
//! - Deliver outbound text frames to the connection's writer task

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identifier a client announces for itself. Not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ClientId {
    Numeric(i64),
    Named(String),
}

impl FromStr for ClientId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => ClientId::Numeric(n),
            Err(_) => ClientId::Named(s.to_string()),
        })
    }
}

impl From<i64> for ClientId {
    fn from(n: i64) -> Self {
        ClientId::Numeric(n)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId::Named(s.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientId::Numeric(n) => write!(f, "{}", n),
            ClientId::Named(s) => f.write_str(s),
        }
    }
}

/// Why a connection stopped accepting frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The writer side is gone (socket closed or task ended).
    PeerGone,
    /// The outbound queue stayed full past the send timeout.
    Stalled,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerGone => f.write_str("peer gone"),
            CloseReason::Stalled => f.write_str("send queue stalled"),
        }
    }
}

/// A send to a connection that is no longer writable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection {connection} (client {client}) closed: {reason}")]
pub struct ConnectionClosed {
    pub connection: ConnectionId,
    pub client: ClientId,
    pub reason: CloseReason,
}

/// Cloneable handle to one open duplex connection.
///
/// Frames sent through the handle are queued for the connection's writer task,
/// which owns the socket's sink half.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    client: ClientId,
    tx: mpsc::Sender<String>,
    send_timeout: Duration,
}

impl Connection {
    /// Create a handle and the receiver its writer task should drain.
    pub fn channel(
        client: ClientId,
        queue: usize,
        send_timeout: Duration,
    ) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            client,
            tx,
            send_timeout,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn client(&self) -> &ClientId {
        &self.client
    }

    /// True once the writer side has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue one text frame, waiting at most the send timeout for queue space.
    pub async fn send_text(&self, message: impl Into<String>) -> Result<(), ConnectionClosed> {
        match tokio::time::timeout(self.send_timeout, self.tx.send(message.into())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.closed(CloseReason::PeerGone)),
            Err(_) => Err(self.closed(CloseReason::Stalled)),
        }
    }

    fn closed(&self, reason: CloseReason) -> ConnectionClosed {
        ConnectionClosed {
            connection: self.id,
            client: self.client.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn client_id_parses_numbers_first() {
        assert_eq!("42".parse::<ClientId>().unwrap(), ClientId::Numeric(42));
        assert_eq!("-7".parse::<ClientId>().unwrap(), ClientId::Numeric(-7));
        assert_eq!(
            "alice".parse::<ClientId>().unwrap(),
            ClientId::Named("alice".into())
        );
        assert_eq!(ClientId::Numeric(1712).to_string(), "1712");
        assert_eq!(ClientId::from("bob").to_string(), "bob");
    }

    #[tokio::test]
    async fn send_reaches_receiver() {
        let (conn, mut rx) = Connection::channel(ClientId::Numeric(1), 4, Duration::from_millis(50));
        conn.send_text("hello").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_peer_gone() {
        let (conn, rx) = Connection::channel(ClientId::Numeric(1), 4, Duration::from_millis(50));
        drop(rx);
        assert!(conn.is_closed());

        let err = conn.send_text("hello").await.unwrap_err();
        assert_eq!(err.reason, CloseReason::PeerGone);
        assert_eq!(err.connection, conn.id());
    }

    #[tokio::test]
    async fn full_queue_past_timeout_is_stalled() {
        let (conn, _rx) = Connection::channel(ClientId::Numeric(1), 1, Duration::from_millis(20));
        conn.send_text("first").await.unwrap();

        let err = conn.send_text("second").await.unwrap_err();
        assert_eq!(err.reason, CloseReason::Stalled);
    }
}
