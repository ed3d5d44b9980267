use serde::{Deserialize, Serialize};
use std::fmt;

/// Axial neighbor offsets for a pointy-top hex layout, indexed by direction.
const DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),  // East
    (1, -1), // Northeast
    (0, -1), // Northwest
    (-1, 0), // West
    (-1, 1), // Southwest
    (0, 1),  // Southeast
];

/// Cube coordinate of a single map hex. Valid coordinates satisfy `q + r + s == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CubeCoord {
    pub q: i32,
    pub r: i32,
    pub s: i32,
}

impl CubeCoord {
    /// Build a coordinate from its axial part; `s` is derived.
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    pub fn origin() -> Self {
        Self { q: 0, r: 0, s: 0 }
    }

    pub fn is_valid(&self) -> bool {
        self.q + self.r + self.s == 0
    }

    /// Neighbor in one of the six directions (0 = East, counting counter-clockwise).
    /// Directions wrap, so 6 is East again.
    pub fn neighbor(&self, direction: usize) -> Self {
        let (dq, dr) = DIRECTIONS[direction % 6];
        Self::new(self.q + dq, self.r + dr)
    }

    pub fn neighbors(&self) -> [CubeCoord; 6] {
        std::array::from_fn(|d| self.neighbor(d))
    }

    /// Hex distance in steps.
    pub fn distance(&self, other: &CubeCoord) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s - other.s).unsigned_abs();
        (dq + dr + ds) / 2
    }
}

impl Default for CubeCoord {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for CubeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.q, self.r, self.s)
    }
}

/// All coordinates within `radius` steps of `center`, ordered by q then r.
///
/// A radius of `n` yields `3n(n+1) + 1` hexes.
pub fn hexes_within(center: CubeCoord, radius: u32) -> Vec<CubeCoord> {
    let n = radius as i32;
    let mut hexes = Vec::with_capacity(hex_count(radius));
    for dq in -n..=n {
        let r_min = (-n).max(-dq - n);
        let r_max = n.min(-dq + n);
        for dr in r_min..=r_max {
            hexes.push(CubeCoord::new(center.q + dq, center.r + dr));
        }
    }
    hexes
}

/// Number of hexes inside a hexagonal region of the given radius.
pub fn hex_count(radius: u32) -> usize {
    let n = radius as usize;
    3 * n * (n + 1) + 1
}
