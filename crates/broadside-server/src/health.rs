use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    pub players: usize,
    pub matches: usize,
    /// Best-effort deliveries dropped on a full or closed queue.
    pub dropped_deliveries: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.ws_connection_count.load(Ordering::Relaxed),
        players: state.players.len().await,
        matches: state.matches.len().await,
        dropped_deliveries: state.players.dropped_deliveries(),
    })
}
