//! Ship types, fleet placement and the placement validator.
//!
//! A fleet submission is a list of [`ShipPlacement`]s straight off the wire.
//! [`Fleet::from_placements`] validates it and produces both the board and a
//! per-ship index of occupied cells with remaining health, so later sink
//! detection never has to infer ships from the grid.

use serde::{Deserialize, Serialize};

use crate::board::{BOARD_SIZE, Board, Cell, Coord};

/// The five ship classes every fleet contains exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipType {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipType {
    pub const ALL: [ShipType; 5] = [
        ShipType::Carrier,
        ShipType::Battleship,
        ShipType::Cruiser,
        ShipType::Submarine,
        ShipType::Destroyer,
    ];

    pub const fn size(self) -> usize {
        match self {
            Self::Carrier => 5,
            Self::Battleship => 4,
            Self::Cruiser | Self::Submarine => 3,
            Self::Destroyer => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carrier => "carrier",
            Self::Battleship => "battleship",
            Self::Cruiser => "cruiser",
            Self::Submarine => "submarine",
            Self::Destroyer => "destroyer",
        }
    }

    /// Parse a wire tag. Ship tags are exact and lowercase.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ShipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total number of ship cells in a complete fleet.
pub const FLEET_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Direction a ship extends from its anchor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Extends towards +x.
    Horizontal,
    /// Extends towards +y.
    Vertical,
}

impl Orientation {
    /// Orientation tags are case-insensitive: `H`/`h` and `V`/`v`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "H" | "h" => Some(Self::Horizontal),
            "V" | "v" => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// One ship as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    #[serde(rename = "type", default)]
    pub ship_type: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub dir: String,
}

impl ShipPlacement {
    pub fn new(ship_type: ShipType, x: i64, y: i64, dir: &str) -> Self {
        Self {
            ship_type: ship_type.as_str().to_string(),
            x,
            y,
            dir: dir.to_string(),
        }
    }
}

/// Reasons a fleet submission is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    UnknownShipType(String),
    OutOfBounds(ShipType),
    Overlap,
    InvalidDirection(String),
    /// A ship class is missing or appears more than once.
    InvalidFleet,
}

impl PlacementError {
    /// Stable tag for the error, without detail.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::UnknownShipType(_) => "unknown_ship_type",
            Self::OutOfBounds(_) => "out_of_bounds",
            Self::Overlap => "overlap",
            Self::InvalidDirection(_) => "invalid_direction",
            Self::InvalidFleet => "invalid_fleet",
        }
    }
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownShipType(t) => write!(f, "{}:{t}", self.tag()),
            Self::OutOfBounds(t) => write!(f, "{}:{t}", self.tag()),
            Self::Overlap | Self::InvalidDirection(_) | Self::InvalidFleet => {
                f.write_str(self.tag())
            },
        }
    }
}

impl std::error::Error for PlacementError {}

/// What a shot did to a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Miss,
    Hit,
    /// The hit took the ship's last health point.
    Sunk(ShipType),
}

/// A ship on the board together with its health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedShip {
    pub ship_type: ShipType,
    pub cells: Vec<Coord>,
    pub remaining: usize,
}

impl PlacedShip {
    pub fn is_sunk(&self) -> bool {
        self.remaining == 0
    }
}

/// A validated fleet: the board and the ship index built from the same placements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    board: Board,
    ships: Vec<PlacedShip>,
}

impl Fleet {
    /// Validate a submission and lay it out on a fresh board.
    pub fn from_placements(placements: &[ShipPlacement]) -> Result<Self, PlacementError> {
        let mut board = Board::new();
        let mut ships = Vec::with_capacity(placements.len());
        let mut seen = [0usize; ShipType::ALL.len()];

        for placement in placements {
            let ship_type = ShipType::from_tag(&placement.ship_type)
                .ok_or_else(|| PlacementError::UnknownShipType(placement.ship_type.clone()))?;
            seen[ship_type.index()] += 1;

            let orientation = Orientation::from_tag(&placement.dir)
                .ok_or_else(|| PlacementError::InvalidDirection(placement.dir.clone()))?;
            let cells = ship_cells(placement.x, placement.y, orientation, ship_type.size())
                .ok_or(PlacementError::OutOfBounds(ship_type))?;

            for &cell in &cells {
                if board.get(cell) != Cell::Empty {
                    return Err(PlacementError::Overlap);
                }
                board.set(cell, Cell::Ship);
            }

            ships.push(PlacedShip {
                ship_type,
                remaining: cells.len(),
                cells,
            });
        }

        if seen.iter().any(|&n| n != 1) {
            return Err(PlacementError::InvalidFleet);
        }

        Ok(Self { board, ships })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ships(&self) -> &[PlacedShip] {
        &self.ships
    }

    pub fn ship(&self, ship_type: ShipType) -> Option<&PlacedShip> {
        self.ships.iter().find(|s| s.ship_type == ship_type)
    }

    /// True once every ship cell on the board has been hit.
    pub fn all_sunk(&self) -> bool {
        !self.board.has_ships_afloat()
    }

    /// Resolve a shot against this fleet. Returns `None` if the cell was
    /// already shot, leaving the board untouched.
    pub fn strike(&mut self, at: Coord) -> Option<Impact> {
        match self.board.get(at) {
            Cell::Hit | Cell::Miss => None,
            Cell::Empty => {
                self.board.set(at, Cell::Miss);
                Some(Impact::Miss)
            },
            Cell::Ship => {
                self.board.set(at, Cell::Hit);
                let ship = self.ships.iter_mut().find(|s| s.cells.contains(&at));
                debug_assert!(ship.is_some(), "ship cell {at:?} missing from fleet index");
                match ship {
                    Some(ship) if ship.remaining > 0 => {
                        ship.remaining -= 1;
                        if ship.remaining == 0 {
                            Some(Impact::Sunk(ship.ship_type))
                        } else {
                            Some(Impact::Hit)
                        }
                    },
                    _ => Some(Impact::Hit),
                }
            },
        }
    }
}

/// Validate a submission and return only its board.
pub fn build_board(placements: &[ShipPlacement]) -> Result<Board, PlacementError> {
    Fleet::from_placements(placements).map(|fleet| fleet.board)
}

/// Cells covered by a run of `size` from `(x, y)`, or `None` if any leaves the grid.
fn ship_cells(x: i64, y: i64, orientation: Orientation, size: usize) -> Option<Vec<Coord>> {
    let (dx, dy) = match orientation {
        Orientation::Horizontal => (1, 0),
        Orientation::Vertical => (0, 1),
    };
    (0..size as i64)
        .map(|i| Coord::checked(x + dx * i, y + dy * i))
        .collect()
}
