//! Hex coordinate system using axial coordinates (q, r).
//!
//! This module provides the positional keys the board topology is built from:
//! - `HexCoord`: Identifies individual hex tiles
//! - `VertexCoord`: Identifies corners where settlements/cities are placed
//! - `EdgeCoord`: Identifies sides where roads are placed
//!
//! Hexes are pointy-top. Corners are numbered clockwise from the top
//! (0 = north, 1 = north-east, ..., 5 = north-west) and side `i` runs from
//! corner `i` to corner `i + 1`, so side 0 is the north-east side and side 4
//! the west side.
//!
//! Every physical corner is the north or south corner of exactly one hex,
//! which gives an exact integer canonical form without any distance
//! thresholds. Every physical side is shared by two hexes; its canonical form
//! is the description from the hex with the smaller `(q, r)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of corners (and sides) of a hex.
pub const HEX_SIDES: u8 = 6;

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The hex across the given side (0-5).
    pub fn neighbor(&self, side: u8) -> HexCoord {
        let (dq, dr) = match side % HEX_SIDES {
            0 => (1, -1), // NorthEast
            1 => (1, 0),  // East
            2 => (0, 1),  // SouthEast
            3 => (-1, 1), // SouthWest
            4 => (-1, 0), // West
            _ => (0, -1), // NorthWest
        };
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// The six neighboring hexes, indexed by side
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [0, 1, 2, 3, 4, 5].map(|side| self.neighbor(side))
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// All hexes within `radius` steps of this one, in ring order starting
    /// from the centre.
    pub fn spiral(&self, radius: u32) -> Vec<HexCoord> {
        let mut hexes = vec![*self];
        for ring in 1..=radius as i32 {
            // Start on the west corner of the ring and walk each side.
            let mut cursor = HexCoord::new(self.q - ring, self.r);
            for side in 0..HEX_SIDES {
                for _ in 0..ring {
                    hexes.push(cursor);
                    cursor = cursor.neighbor(side);
                }
            }
        }
        hexes
    }

    /// Canonical key of corner `corner` (0-5) of this hex.
    pub fn corner(&self, corner: u8) -> VertexCoord {
        match corner % HEX_SIDES {
            0 => VertexCoord::new(*self, Pole::North),
            1 => VertexCoord::new(self.neighbor(0), Pole::South),
            2 => VertexCoord::new(self.neighbor(2), Pole::North),
            3 => VertexCoord::new(*self, Pole::South),
            4 => VertexCoord::new(self.neighbor(3), Pole::North),
            _ => VertexCoord::new(self.neighbor(5), Pole::South),
        }
    }

    /// Canonical key of side `side` (0-5) of this hex.
    pub fn side(&self, side: u8) -> EdgeCoord {
        EdgeCoord::new(*self, side)
    }

    /// All six corners, indexed by corner number
    pub fn corners(&self) -> [VertexCoord; 6] {
        [0, 1, 2, 3, 4, 5].map(|corner| self.corner(corner))
    }

    /// All six sides, indexed by side number
    pub fn sides(&self) -> [EdgeCoord; 6] {
        [0, 1, 2, 3, 4, 5].map(|side| self.side(side))
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Which pole of its owning hex a corner is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pole {
    /// Top corner of the hex (corner 0)
    North,
    /// Bottom corner of the hex (corner 3)
    South,
}

/// Canonical positional key of a corner where up to 3 hexes meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexCoord {
    /// The hex whose north or south pole this corner is
    pub hex: HexCoord,
    /// North or South pole of `hex`
    pub pole: Pole,
}

impl VertexCoord {
    pub const fn new(hex: HexCoord, pole: Pole) -> Self {
        Self { hex, pole }
    }

    /// The `(q, r, corner)` positional key of this vertex.
    pub fn key(&self) -> (i32, i32, u8) {
        let corner = match self.pole {
            Pole::North => 0,
            Pole::South => 3,
        };
        (self.hex.q, self.hex.r, corner)
    }

    /// The 3 hexes (on an unbounded grid) that touch this corner
    pub fn touching_hexes(&self) -> [HexCoord; 3] {
        match self.pole {
            Pole::North => [self.hex, self.hex.neighbor(5), self.hex.neighbor(0)],
            Pole::South => [self.hex, self.hex.neighbor(3), self.hex.neighbor(2)],
        }
    }
}

/// Canonical positional key of a hex side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeCoord {
    /// The hex this side is described from (the smaller of the two)
    pub hex: HexCoord,
    /// Side index 0-5 on `hex`
    pub side: u8,
}

impl EdgeCoord {
    /// Create a new edge coordinate (automatically canonicalized)
    pub fn new(hex: HexCoord, side: u8) -> Self {
        Self {
            hex,
            side: side % HEX_SIDES,
        }
        .canonical()
    }

    /// Pick the description from the hex with the smaller `(q, r)`.
    pub fn canonical(self) -> Self {
        let other = self.hex.neighbor(self.side);
        if self.hex <= other {
            self
        } else {
            Self {
                hex: other,
                side: (self.side + 3) % HEX_SIDES,
            }
        }
    }

    /// The `(q, r, side)` positional key of this edge.
    pub fn key(&self) -> (i32, i32, u8) {
        (self.hex.q, self.hex.r, self.side)
    }

    /// The 2 hexes (on an unbounded grid) that share this side
    pub fn touching_hexes(&self) -> [HexCoord; 2] {
        [self.hex, self.hex.neighbor(self.side)]
    }

    /// The 2 corners at the ends of this side
    pub fn endpoints(&self) -> [VertexCoord; 2] {
        [
            self.hex.corner(self.side),
            self.hex.corner((self.side + 1) % HEX_SIDES),
        ]
    }
}
