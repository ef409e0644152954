//! Per-match state machine: readiness, turn order and shot resolution.
//!
//! `MatchState` is plain data with no locking or I/O; the server wraps each
//! instance in its own mutex and turns the returned outcomes into envelopes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord};
use crate::fleet::{Fleet, Impact, PlacementError, ShipPlacement, ShipType};
use crate::player::{MatchId, PlayerId};

/// Fixed per-match participant label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
}

impl Side {
    pub const fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// At least one side has not submitted a valid fleet.
    AwaitingFleets,
    InProgress,
    Finished,
}

/// Rejections from match operations. None of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    MatchNotFound,
    OutOfBounds,
    UnknownPlayer,
    NotYourTurn,
    BoardMissing(Side),
    AlreadyShot,
    AlreadyPlaced,
    MatchFinished,
    Placement(PlacementError),
}

impl GameError {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MatchNotFound => "match_not_found",
            Self::OutOfBounds => "out_of_bounds",
            Self::UnknownPlayer => "unknown_player",
            Self::NotYourTurn => "not_your_turn",
            Self::BoardMissing(Side::A) => "playerA_board_missing",
            Self::BoardMissing(Side::B) => "playerB_board_missing",
            Self::AlreadyShot => "already_shot",
            Self::AlreadyPlaced => "ships_already_placed",
            Self::MatchFinished => "match_finished",
            Self::Placement(e) => e.tag(),
        }
    }
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placement(e) => write!(f, "{e}"),
            other => f.write_str(other.tag()),
        }
    }
}

impl std::error::Error for GameError {}

impl From<PlacementError> for GameError {
    fn from(e: PlacementError) -> Self {
        Self::Placement(e)
    }
}

/// Result of an accepted shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotOutcome {
    pub at: Coord,
    pub hit: bool,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    /// Set on the shot that took a ship's last health point.
    pub sunk: Option<ShipType>,
    /// Set when the shot removed the opponent's last ship cell.
    pub winner_id: Option<PlayerId>,
    /// Whose turn it is after this shot; `None` once the match is over.
    pub next_turn: Option<Side>,
}

impl ShotOutcome {
    pub fn game_over(&self) -> bool {
        self.winner_id.is_some()
    }
}

/// Mutable state of one match.
#[derive(Debug, Clone)]
pub struct MatchState {
    match_id: MatchId,
    players: [PlayerId; 2],
    fleets: [Option<Fleet>; 2],
    turn: Option<Side>,
    winner: Option<PlayerId>,
}

impl MatchState {
    pub fn new(match_id: MatchId, side_a: PlayerId, side_b: PlayerId) -> Self {
        Self {
            match_id,
            players: [side_a, side_b],
            fleets: [None, None],
            turn: None,
            winner: None,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn player(&self, side: Side) -> &str {
        &self.players[side.index()]
    }

    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        [Side::A, Side::B]
            .into_iter()
            .find(|&side| self.player(side) == player_id)
    }

    pub fn is_ready(&self, side: Side) -> bool {
        self.fleets[side.index()].is_some()
    }

    /// Current turn. Only meaningful once both sides are ready.
    pub fn turn(&self) -> Option<Side> {
        self.turn
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn phase(&self) -> MatchPhase {
        if self.winner.is_some() {
            MatchPhase::Finished
        } else if self.is_ready(Side::A) && self.is_ready(Side::B) {
            MatchPhase::InProgress
        } else {
            MatchPhase::AwaitingFleets
        }
    }

    pub fn board(&self, side: Side) -> Option<&Board> {
        self.fleets[side.index()].as_ref().map(Fleet::board)
    }

    pub fn fleet(&self, side: Side) -> Option<&Fleet> {
        self.fleets[side.index()].as_ref()
    }

    /// Store a player's fleet and mark them ready.
    ///
    /// When this makes both sides ready, a random starting side is chosen and
    /// returned; otherwise returns `Ok(None)`.
    pub fn place_fleet<R: Rng>(
        &mut self,
        player_id: &str,
        placements: &[ShipPlacement],
        rng: &mut R,
    ) -> Result<Option<Side>, GameError> {
        let side = self.side_of(player_id).ok_or(GameError::UnknownPlayer)?;
        if self.winner.is_some() {
            return Err(GameError::MatchFinished);
        }
        if self.is_ready(side) {
            return Err(GameError::AlreadyPlaced);
        }

        let fleet = Fleet::from_placements(placements)?;
        self.fleets[side.index()] = Some(fleet);

        if self.is_ready(side.opposite()) {
            let start = if rng.random_bool(0.5) { Side::A } else { Side::B };
            self.turn = Some(start);
            Ok(Some(start))
        } else {
            Ok(None)
        }
    }

    /// Resolve a shot from `shooter_id` at `(x, y)` on the opponent's board.
    ///
    /// A hit keeps the turn with the shooter, a miss passes it over. Shots are
    /// never queued: anything out of turn is rejected.
    pub fn fire(&mut self, shooter_id: &str, x: i64, y: i64) -> Result<ShotOutcome, GameError> {
        let at = Coord::checked(x, y).ok_or(GameError::OutOfBounds)?;
        let shooter = self.side_of(shooter_id).ok_or(GameError::UnknownPlayer)?;
        if self.winner.is_some() {
            return Err(GameError::MatchFinished);
        }
        if self.turn != Some(shooter) {
            return Err(GameError::NotYourTurn);
        }
        for side in [Side::A, Side::B] {
            if !self.is_ready(side) {
                return Err(GameError::BoardMissing(side));
            }
        }

        let target = shooter.opposite();
        let fleet = self.fleets[target.index()]
            .as_mut()
            .ok_or(GameError::BoardMissing(target))?;
        let impact = fleet.strike(at).ok_or(GameError::AlreadyShot)?;
        let all_sunk = fleet.all_sunk();

        let (hit, sunk) = match impact {
            Impact::Miss => (false, None),
            Impact::Hit => (true, None),
            Impact::Sunk(ship_type) => (true, Some(ship_type)),
        };

        let winner_id = if all_sunk {
            self.winner = Some(shooter_id.to_string());
            Some(shooter_id.to_string())
        } else {
            if !hit {
                self.turn = Some(target);
            }
            None
        };

        Ok(ShotOutcome {
            at,
            hit,
            shooter_id: shooter_id.to_string(),
            target_id: self.player(target).to_string(),
            sunk,
            next_turn: if winner_id.is_some() { None } else { self.turn },
            winner_id,
        })
    }

    /// End the match in the opponent's favour because `leaver_id` is gone.
    ///
    /// Returns the winner's id, or `None` if the match was already decided or
    /// `leaver_id` is not a participant.
    pub fn forfeit(&mut self, leaver_id: &str) -> Option<PlayerId> {
        if self.winner.is_some() {
            return None;
        }
        let leaver = self.side_of(leaver_id)?;
        let winner = self.player(leaver.opposite()).to_string();
        self.winner = Some(winner.clone());
        Some(winner)
    }
}
