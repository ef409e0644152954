use serde::{Deserialize, Serialize};

/// Opaque per-connection player identifier (a UUID string).
pub type PlayerId = String;

/// Opaque match identifier (a UUID string).
pub type MatchId = String;

/// Read-only view of a connected player, as reported by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
}

/// Name used until a player sends a non-empty `join`.
pub fn default_display_name(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("Player-{prefix}")
}

/// Pick the display name for a `join`, falling back to the id-derived default.
pub fn resolve_display_name(id: &str, requested: &str) -> String {
    if requested.is_empty() {
        default_display_name(id)
    } else {
        requested.to_string()
    }
}
