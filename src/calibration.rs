//! ADC calibration for proxy position sensing
//!
//! Each board slot exposes three voltage dividers: one selecting the tile
//! (16 tiles on a 4x4 grid) and two selecting the row and column within that
//! tile. A proxy samples all three with its 12-bit ADC and reports the raw
//! values; the hub turns them back into an absolute board position.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Full-scale reading of the proxies' 12-bit ADC
pub const ADC_MAX: f64 = 4095.0;
/// ADC reference voltage
pub const ADC_REFERENCE_VOLTS: f64 = 3.3;

/// Measured divider output per tile, in board scan order
const TILE_LEVELS: [(f64, u8); 16] = [
    // Row 1
    (5.26, 4),
    (4.57, 3),
    (4.25, 2),
    (3.85, 1),
    // Row 2
    (3.51, 5),
    (3.19, 6),
    (2.86, 7),
    (2.54, 8),
    // Row 3
    (2.30, 12),
    (1.98, 11),
    (1.67, 10),
    (1.36, 9),
    // Row 4
    (1.07, 13),
    (0.76, 14),
    (0.45, 15),
    (0.06, 16),
];

const ROW_LEVELS: [(f64, u8); 4] = [(5.1, 1), (3.6, 2), (2.2, 3), (0.7, 4)];

const COL_LEVELS: [(f64, u8); 4] = [(4.4, 1), (2.9, 2), (1.5, 3), (0.2, 4)];

/// Offset of each tile's top-left slot, indexed by tile number - 1
const TILE_OFFSETS: [(u8, u8); 16] = [
    (0, 0),
    (0, 4),
    (0, 8),
    (0, 12),
    (4, 0),
    (4, 4),
    (4, 8),
    (4, 12),
    (8, 0),
    (8, 4),
    (8, 8),
    (8, 12),
    (12, 0),
    (12, 4),
    (12, 8),
    (12, 12),
];

/// One of the three sensing lines of a board slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseLine {
    Tile,
    Row,
    Col,
}

impl SenseLine {
    pub fn name(self) -> &'static str {
        match self {
            SenseLine::Tile => "tile",
            SenseLine::Row => "row",
            SenseLine::Col => "col",
        }
    }

    /// Inverse of the divider on the proxy side
    fn divider_factor(self) -> f64 {
        match self {
            SenseLine::Tile => 1.68,
            SenseLine::Row | SenseLine::Col => 1.51,
        }
    }

    fn levels(self) -> &'static [(f64, u8)] {
        match self {
            SenseLine::Tile => &TILE_LEVELS,
            SenseLine::Row => &ROW_LEVELS,
            SenseLine::Col => &COL_LEVELS,
        }
    }

    /// Accepted window around a level as (below, above)
    fn tolerance(self) -> (f64, f64) {
        match self {
            SenseLine::Tile => (0.22, 0.05),
            SenseLine::Row | SenseLine::Col => (1.0, 0.05),
        }
    }
}

impl fmt::Display for SenseLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of matching a voltage against a line's levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelMatch {
    pub number: u8,
    /// False when no window contained the voltage and the closest level was taken
    pub exact: bool,
}

/// Absolute slot on the board (row, column), both 1-based within a 16x16 grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Convert a raw ADC reading to the voltage at the divider input
pub fn raw_to_voltage(raw: u16, line: SenseLine) -> f64 {
    let adc = (f64::from(raw) / ADC_MAX) * ADC_REFERENCE_VOLTS;
    adc * line.divider_factor()
}

/// Match a voltage to a level: first window hit wins, else the closest level
pub fn match_level(voltage: f64, line: SenseLine) -> LevelMatch {
    let (below, above) = line.tolerance();
    let levels = line.levels();

    if let Some(&(_, number)) = levels
        .iter()
        .find(|(level, _)| level - below <= voltage && voltage <= level + above)
    {
        return LevelMatch {
            number,
            exact: true,
        };
    }

    let closest = levels
        .iter()
        .min_by(|(a, _), (b, _)| (a - voltage).abs().total_cmp(&(b - voltage).abs()))
        .map(|&(_, number)| number)
        .unwrap_or(0);

    LevelMatch {
        number: closest,
        exact: false,
    }
}

/// Convert a raw reading to its tile/row/column number
pub fn convert(raw: u16, line: SenseLine) -> u8 {
    let voltage = raw_to_voltage(raw, line);
    let matched = match_level(voltage, line);
    if !matched.exact {
        warn!(
            "No {} level matches {:.2}V (raw {}), falling back to closest: {}",
            line, voltage, raw, matched.number
        );
    }
    matched.number
}

/// Turn a tile-relative (row, col) into an absolute board position.
/// Tile 0 means no tile divider was detected and the position is left as is.
pub fn apply_tile_offset(tile: u8, row: u8, col: u8) -> Position {
    match tile
        .checked_sub(1)
        .and_then(|i| TILE_OFFSETS.get(usize::from(i)))
    {
        Some(&(row_offset, col_offset)) => Position::new(row + row_offset, col + col_offset),
        None => Position::new(row, col),
    }
}

/// Resolve the three raw readings of a proxy into a board position
pub fn resolve_position(tile_raw: u16, row_raw: u16, col_raw: u16) -> Position {
    let tile = convert(tile_raw, SenseLine::Tile);
    let row = convert(row_raw, SenseLine::Row);
    let col = convert(col_raw, SenseLine::Col);
    apply_tile_offset(tile, row, col)
}
