//! Duplex connection registry.
//!
//! # Data Flow
//! ```text
//! websocket upgrade
//!     → connection.rs (handle + bounded outbound queue)
//!     → manager.rs (register; guard disconnects on drop)
//!     → send / broadcast → queue → writer task → socket
//! ```
//!
//! # Design Decisions
//! - Connections are keyed by a process-unique ConnectionId; client ids only label them
//! - Disconnect is idempotent
//! - A failed broadcast delivery removes the connection and does not stop the broadcast

pub mod connection;
pub mod manager;

pub use connection::{ClientId, CloseReason, Connection, ConnectionClosed, ConnectionId};
pub use manager::{BroadcastReport, ConnectionInfo, ConnectionRegistry, Registration};
