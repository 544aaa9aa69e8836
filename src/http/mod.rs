//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span)
//!     → middleware/ (process time, journal)
//!     → items.rs / websocket.rs / admin (handlers)
//!     → error.rs (handler errors → JSON detail)
//!     → Send to client
//! ```

pub mod error;
pub mod items;
pub mod middleware;
pub mod request;
pub mod server;
pub mod websocket;

pub use error::ApiError;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
