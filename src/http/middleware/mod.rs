//! HTTP middleware.
//!
//! # Order (outermost first)
//! ```text
//! request id → trace → propagate id → process_time → request_log → timeout → body limit → handler
//! ```
//! `request_log` is applied to the HTTP routes only; websocket routes are not journaled.
//! The timeout and body limit sit inside it so their responses are journaled.

pub mod process_time;
pub mod request_log;

pub use process_time::{process_time, X_PROCESS_TIME};
pub use request_log::request_log;
