//! Read-only listing endpoints for lobby and spectator pages.

use axum::extract::State;
use axum::response::Json;

use broadside_core::player::PlayerSummary;

use crate::match_registry::MatchSummary;
use crate::state::AppState;

/// GET /api/players: connected players ordered by id.
pub async fn list_players(State(state): State<AppState>) -> Json<Vec<PlayerSummary>> {
    Json(state.players.snapshot().await)
}

/// GET /api/games: every match ordered by id, finished ones included.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<MatchSummary>> {
    Json(state.matches.summaries().await)
}
