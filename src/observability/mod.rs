//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → errors.rs (operational errors hidden from clients)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → /admin/errors
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the tracing span of every request
//! - Metrics are cheap (atomic increments)

pub mod errors;
pub mod logging;
pub mod metrics;

pub use errors::{ErrorSource, OperationalError, OperationalErrors};
