use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::OperationalError;
use crate::registry::ConnectionInfo;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub live_connections: usize,
    pub operational_errors: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        live_connections: state.registry.len(),
        operational_errors: state.errors.total(),
    })
}

pub async fn get_connections(State(state): State<AppState>) -> Json<Vec<ConnectionInfo>> {
    Json(state.registry.snapshot())
}

pub async fn get_errors(State(state): State<AppState>) -> Json<Vec<OperationalError>> {
    Json(state.errors.recent())
}
