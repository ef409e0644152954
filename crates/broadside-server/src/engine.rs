//! Match Engine: drives `MatchState` under each match's lock and fans the
//! outcomes out to both participants.
//!
//! Deliveries made while a match lock is held are best-effort (`try_send`),
//! so a stalled client can never pin the lock. Lock order is always the match
//! lock first, then the player registry's read lock.

use std::sync::Arc;

use broadside_core::fleet::ShipPlacement;
use broadside_core::game::{GameError, ShotOutcome, Side};
use broadside_core::net::messages::{
    AllShipsReadyMsg, MatchForfeitMsg, ServerMessage, ShipSunkMsg, ShotResultMsg,
};
use broadside_core::player::MatchId;

use crate::match_registry::MatchRegistry;
use crate::matchmaking::{MatchRecord, SideAssignment, create_match};
use crate::player_registry::PlayerRegistry;

#[derive(Clone)]
pub struct MatchEngine {
    players: Arc<PlayerRegistry>,
    matches: Arc<MatchRegistry>,
}

impl MatchEngine {
    pub fn new(players: Arc<PlayerRegistry>, matches: Arc<MatchRegistry>) -> Self {
        Self { players, matches }
    }

    /// Create a match for an accepted challenge and register its state.
    pub async fn open_match(
        &self,
        challenger_id: &str,
        accepter_id: &str,
    ) -> (MatchRecord, SideAssignment) {
        let (record, sides) = {
            let mut rng = rand::rng();
            create_match(challenger_id, accepter_id, &mut rng)
        };
        self.matches.create(&record, &sides).await;
        tracing::info!(
            match_id = %record.id,
            side_a = %sides.side_a,
            side_b = %sides.side_b,
            "Match created"
        );
        (record, sides)
    }

    /// Validate and store a player's fleet.
    ///
    /// When this submission makes both sides ready, each participant is sent
    /// `all_ships_ready` with the randomly chosen starting side.
    pub async fn submit_ships(
        &self,
        match_id: &str,
        player_id: &str,
        ships: &[ShipPlacement],
    ) -> Result<Option<Side>, GameError> {
        let entry = self
            .matches
            .get(match_id)
            .await
            .ok_or(GameError::MatchNotFound)?;
        let mut state = entry.lock().await;

        let start = {
            let mut rng = rand::rng();
            state.place_fleet(player_id, ships, &mut rng)?
        };
        tracing::info!(match_id, player_id, "Fleet accepted");

        if let Some(start_turn) = start {
            tracing::info!(match_id, start_turn = %start_turn, "Both fleets ready");
            for side in [Side::A, Side::B] {
                let msg = ServerMessage::AllShipsReady(AllShipsReadyMsg {
                    match_id: match_id.to_string(),
                    start_turn,
                    your_side: side,
                    opponent_id: state.player(side.opposite()).to_string(),
                });
                self.players.deliver(state.player(side), &msg).await;
            }
        }
        Ok(start)
    }

    /// Resolve a shot and broadcast its outcome to both participants.
    ///
    /// Rejections are returned to the caller and nothing is broadcast.
    pub async fn process_shot(
        &self,
        match_id: &str,
        shooter_id: &str,
        x: i64,
        y: i64,
    ) -> Result<ShotOutcome, GameError> {
        let entry = self
            .matches
            .get(match_id)
            .await
            .ok_or(GameError::MatchNotFound)?;
        let mut state = entry.lock().await;
        let outcome = state.fire(shooter_id, x, y)?;

        tracing::debug!(
            match_id,
            shooter_id,
            x = outcome.at.x,
            y = outcome.at.y,
            hit = outcome.hit,
            "Shot resolved"
        );

        let result = ServerMessage::ShotResult(shot_result(match_id, &outcome));
        self.broadcast(&outcome, &result).await;

        if let Some(ship_type) = outcome.sunk {
            tracing::info!(match_id, ship = %ship_type, owner_id = %outcome.target_id, "Ship sunk");
            let sunk = ServerMessage::ShipSunk(ShipSunkMsg {
                match_id: match_id.to_string(),
                ship_type,
                owner_id: outcome.target_id.clone(),
                by_id: outcome.shooter_id.clone(),
            });
            self.broadcast(&outcome, &sunk).await;
        }

        if let Some(winner_id) = &outcome.winner_id {
            tracing::info!(match_id, winner_id = %winner_id, "Match finished");
        }
        Ok(outcome)
    }

    /// Forfeit every unfinished match the departing player takes part in.
    /// Returns the ids of the matches that were ended.
    pub async fn player_left(&self, player_id: &str) -> Vec<MatchId> {
        let mut ended = Vec::new();
        for entry in self.matches.matches_for(player_id).await {
            let mut state = entry.lock().await;
            let Some(winner_id) = state.forfeit(player_id) else {
                continue;
            };
            tracing::info!(
                match_id = %entry.id,
                winner_id = %winner_id,
                loser_id = player_id,
                "Match forfeited"
            );
            let msg = ServerMessage::MatchForfeit(MatchForfeitMsg {
                match_id: entry.id.clone(),
                winner_id: winner_id.clone(),
                loser_id: player_id.to_string(),
            });
            self.players.deliver(&winner_id, &msg).await;
            drop(state);
            ended.push(entry.id.clone());
        }
        ended
    }

    async fn broadcast(&self, outcome: &ShotOutcome, msg: &ServerMessage) {
        self.players.deliver(&outcome.shooter_id, msg).await;
        self.players.deliver(&outcome.target_id, msg).await;
    }
}

fn shot_result(match_id: &str, outcome: &ShotOutcome) -> ShotResultMsg {
    ShotResultMsg {
        match_id: match_id.to_string(),
        x: outcome.at.x,
        y: outcome.at.y,
        shooter_id: outcome.shooter_id.clone(),
        target_id: outcome.target_id.clone(),
        hit: outcome.hit,
        message: if outcome.hit { "hit" } else { "miss" }.to_string(),
        game_over: outcome.game_over(),
        winner_id: outcome.winner_id.clone(),
        next_turn: outcome.next_turn,
    }
}
