use serde::{Deserialize, Serialize};

/// Width and height of every board.
pub const BOARD_SIZE: usize = 10;

/// State of a single board cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Ship,
    Hit,
    Miss,
}

/// Zero-based board coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Build a coordinate from signed wire values, rejecting anything off the grid.
    pub fn checked(x: i64, y: i64) -> Option<Self> {
        let size = BOARD_SIZE as i64;
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some(Self::new(x as usize, y as usize))
        } else {
            None
        }
    }
}

/// A 10x10 grid indexed as `cells[y][x]`.
///
/// Cells only ever move forward: `Empty` becomes `Ship` during placement or
/// `Miss` when shot, `Ship` becomes `Hit`. Nothing is ever reset to `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, at: Coord) -> Cell {
        self.cells[at.y][at.x]
    }

    pub(crate) fn set(&mut self, at: Coord, cell: Cell) {
        self.cells[at.y][at.x] = cell;
    }

    /// Number of cells currently in the given state.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().flatten().filter(|&&c| c == cell).count()
    }

    /// True while at least one `Ship` cell has not been hit.
    pub fn has_ships_afloat(&self) -> bool {
        self.cells.iter().flatten().any(|&c| c == Cell::Ship)
    }
}
