use serde::{Deserialize, Serialize};

use crate::fleet::{ShipPlacement, ShipType};
use crate::game::Side;
use crate::player::{MatchId, PlayerId};

/// Client-to-server envelope types, keyed by the JSON `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Join,
    Challenge,
    ChallengeResponse,
    PlaceShips,
    ShotFired,
}

impl MessageType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "join" => Some(Self::Join),
            "challenge" => Some(Self::Challenge),
            "challenge_response" => Some(Self::ChallengeResponse),
            "place_ships" => Some(Self::PlaceShips),
            "shot_fired" => Some(Self::ShotFired),
            _ => None,
        }
    }
}

// Client payloads default every field so that absent keys decode to empty
// values and are rejected by the handlers rather than the decoder.

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMsg {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeMsg {
    #[serde(default)]
    pub target_id: PlayerId,
}

/// Reply to a `challenge_request`; `target_id` is the original challenger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponseMsg {
    #[serde(default)]
    pub target_id: PlayerId,
    #[serde(default)]
    pub accept: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceShipsMsg {
    #[serde(default)]
    pub match_id: MatchId,
    #[serde(default)]
    pub ships: Vec<ShipPlacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFiredMsg {
    #[serde(default)]
    pub match_id: MatchId,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinMsg),
    Challenge(ChallengeMsg),
    ChallengeResponse(ChallengeResponseMsg),
    PlaceShips(PlaceShipsMsg),
    ShotFired(ShotFiredMsg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMsg {
    pub id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAckMsg {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequestMsg {
    pub from_id: PlayerId,
    pub from_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponseForwardMsg {
    pub from_id: PlayerId,
    pub from_name: String,
    pub accept: bool,
    pub target_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStartMsg {
    pub match_id: MatchId,
    pub your_side: Side,
    pub opponent_id: PlayerId,
    pub opponent_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipsOkMsg {
    pub match_id: MatchId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllShipsReadyMsg {
    pub match_id: MatchId,
    pub start_turn: Side,
    pub your_side: Side,
    pub opponent_id: PlayerId,
}

/// Outcome of an accepted shot, sent to both participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotResultMsg {
    pub match_id: MatchId,
    pub x: usize,
    pub y: usize,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub hit: bool,
    /// `"hit"` or `"miss"`.
    pub message: String,
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_turn: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSunkMsg {
    pub match_id: MatchId,
    pub ship_type: ShipType,
    pub owner_id: PlayerId,
    pub by_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchForfeitMsg {
    pub match_id: MatchId,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
}

/// Error reply carrying a reason tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub error: String,
}

impl ErrorMsg {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome(WelcomeMsg),
    JoinAck(JoinAckMsg),
    ChallengeRequest(ChallengeRequestMsg),
    ChallengeResponseForward(ChallengeResponseForwardMsg),
    MatchStart(MatchStartMsg),
    ShipsOk(ShipsOkMsg),
    ShipsError(ErrorMsg),
    AllShipsReady(AllShipsReadyMsg),
    ShotResult(ShotResultMsg),
    ShipSunk(ShipSunkMsg),
    MatchForfeit(MatchForfeitMsg),
    ShotError(ErrorMsg),
    Error(ErrorMsg),
}
