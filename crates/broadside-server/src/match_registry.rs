use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use broadside_core::game::{MatchPhase, MatchState, Side};
use broadside_core::player::{MatchId, PlayerId};

use crate::matchmaking::{MatchRecord, SideAssignment};

/// One registered match. Participants are fixed at creation, so they can be
/// read without taking the match lock.
pub struct MatchEntry {
    pub id: MatchId,
    pub participants: [PlayerId; 2],
    pub created_at: u64,
    state: Mutex<MatchState>,
}

impl MatchEntry {
    pub async fn lock(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().await
    }

    pub fn involves(&self, player_id: &str) -> bool {
        self.participants.iter().any(|p| p == player_id)
    }
}

/// Read-only match view for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    #[serde(rename = "playerA_id")]
    pub player_a_id: PlayerId,
    #[serde(rename = "playerB_id")]
    pub player_b_id: PlayerId,
    #[serde(rename = "readyA")]
    pub ready_a: bool,
    #[serde(rename = "readyB")]
    pub ready_b: bool,
    pub turn: Option<Side>,
    pub players: Vec<PlayerId>,
    pub state: MatchPhase,
    pub winner_id: Option<PlayerId>,
    pub created_at: u64,
}

/// Process-wide map of match id to match state.
#[derive(Default)]
pub struct MatchRegistry {
    matches: RwLock<HashMap<MatchId, Arc<MatchEntry>>>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fresh state for a match; the side-A participant per `sides`
    /// is stored as side A.
    pub async fn create(&self, record: &MatchRecord, sides: &SideAssignment) -> Arc<MatchEntry> {
        let entry = Arc::new(MatchEntry {
            id: record.id.clone(),
            participants: record.participants.clone(),
            created_at: record.created_at,
            state: Mutex::new(MatchState::new(
                record.id.clone(),
                sides.side_a.clone(),
                sides.side_b.clone(),
            )),
        });
        let mut matches = self.matches.write().await;
        matches.insert(record.id.clone(), Arc::clone(&entry));
        entry
    }

    pub async fn get(&self, id: &str) -> Option<Arc<MatchEntry>> {
        self.matches.read().await.get(id).cloned()
    }

    /// All matches the player takes part in, finished or not.
    pub async fn matches_for(&self, player_id: &str) -> Vec<Arc<MatchEntry>> {
        self.matches
            .read()
            .await
            .values()
            .filter(|m| m.involves(player_id))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.matches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.matches.read().await.is_empty()
    }

    /// Snapshot every match ordered by id. Match locks are taken one at a
    /// time after the registry lock is released.
    pub async fn summaries(&self) -> Vec<MatchSummary> {
        let mut entries: Vec<Arc<MatchEntry>> =
            self.matches.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let state = entry.lock().await;
            let player_a_id = state.player(Side::A).to_string();
            let player_b_id = state.player(Side::B).to_string();
            out.push(MatchSummary {
                match_id: entry.id.clone(),
                players: vec![player_a_id.clone(), player_b_id.clone()],
                player_a_id,
                player_b_id,
                ready_a: state.is_ready(Side::A),
                ready_b: state.is_ready(Side::B),
                turn: state.turn(),
                state: state.phase(),
                winner_id: state.winner().map(str::to_string),
                created_at: entry.created_at,
            });
        }
        out
    }
}
