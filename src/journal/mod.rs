//! Request/response journal.
//!
//! # Data Flow
//! ```text
//! request ──▶ logger.rs: append Input entry ──▶ handler ──▶ append Output entry ──▶ response
//!                         │                                        │
//!                         └────────── sink.rs (FileSink / MemorySink) ◀┘
//!                                      entry.rs formats one line per entry
//! ```
//!
//! # Design Decisions
//! - The sink lock covers one entry, never the handler
//! - Sink failures go to the operational error channel, never to the client
//! - Handler results pass through untouched

pub mod entry;
pub mod logger;
pub mod sink;

pub use entry::{Capture, Captured, Direction, Exchange, LogEntry};
pub use logger::RequestLogger;
pub use sink::{FileSink, LogSink, LogSinkUnavailable, MemorySink};
