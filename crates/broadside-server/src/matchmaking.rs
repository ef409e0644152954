use rand::Rng;
use uuid::Uuid;

use broadside_core::game::Side;
use broadside_core::player::{MatchId, PlayerId};
use broadside_core::time::unix_now;

/// Outcome of an accepted challenge. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub id: MatchId,
    pub participants: [PlayerId; 2],
    pub created_at: u64,
    pub assigned_at: u64,
}

/// Which participant plays under which side label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideAssignment {
    pub side_a: PlayerId,
    pub side_b: PlayerId,
}

impl SideAssignment {
    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.side_a == player_id {
            Some(Side::A)
        } else if self.side_b == player_id {
            Some(Side::B)
        } else {
            None
        }
    }
}

/// Create a match between two players, flipping a fair coin for side A.
pub fn create_match<R: Rng>(id_a: &str, id_b: &str, rng: &mut R) -> (MatchRecord, SideAssignment) {
    let created_at = unix_now();
    let assignment = if rng.random_bool(0.5) {
        SideAssignment {
            side_a: id_a.to_string(),
            side_b: id_b.to_string(),
        }
    } else {
        SideAssignment {
            side_a: id_b.to_string(),
            side_b: id_a.to_string(),
        }
    };
    let record = MatchRecord {
        id: Uuid::new_v4().to_string(),
        participants: [id_a.to_string(), id_b.to_string()],
        created_at,
        assigned_at: unix_now(),
    };
    (record, assignment)
}
