pub mod board;
pub mod fleet;
pub mod game;
pub mod net;
pub mod player;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::fleet::{ShipPlacement, ShipType};

    /// A valid fleet laid out horizontally on rows 0, 2, 4, 6 and 8, all
    /// anchored at column 0. Columns 5..=9 of every row stay empty.
    pub fn standard_fleet() -> Vec<ShipPlacement> {
        vec![
            ShipPlacement::new(ShipType::Carrier, 0, 0, "H"),
            ShipPlacement::new(ShipType::Battleship, 0, 2, "H"),
            ShipPlacement::new(ShipType::Cruiser, 0, 4, "H"),
            ShipPlacement::new(ShipType::Submarine, 0, 6, "H"),
            ShipPlacement::new(ShipType::Destroyer, 0, 8, "H"),
        ]
    }

    /// A valid fleet laid out vertically in columns 0, 2, 4, 6 and 8, all
    /// anchored at row 0. Rows 5..=9 of every column stay empty.
    pub fn alternate_fleet() -> Vec<ShipPlacement> {
        vec![
            ShipPlacement::new(ShipType::Carrier, 0, 0, "V"),
            ShipPlacement::new(ShipType::Battleship, 2, 0, "V"),
            ShipPlacement::new(ShipType::Cruiser, 4, 0, "V"),
            ShipPlacement::new(ShipType::Submarine, 6, 0, "V"),
            ShipPlacement::new(ShipType::Destroyer, 8, 0, "V"),
        ]
    }

    /// Cells occupied by `ship_type` in [`standard_fleet`].
    pub fn standard_cells(ship_type: ShipType) -> Vec<(i64, i64)> {
        let row = match ship_type {
            ShipType::Carrier => 0,
            ShipType::Battleship => 2,
            ShipType::Cruiser => 4,
            ShipType::Submarine => 6,
            ShipType::Destroyer => 8,
        };
        (0..ship_type.size() as i64).map(|x| (x, row)).collect()
    }
}
