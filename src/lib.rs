//! relaylog: a small HTTP and websocket service that journals every
//! request/response pair and fans chat messages out to live connections.

pub mod admin;
pub mod config;
pub mod http;
pub mod journal;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod security;
pub mod store;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
