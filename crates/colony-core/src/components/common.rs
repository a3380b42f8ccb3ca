//! Common value types shared across tiles, characters and jobs.

use serde::{Deserialize, Serialize};

/// Integer grid coordinate of a tile.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Straight-line distance between tile centres.
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` touches this tile orthogonally, or diagonally if
    /// `diagonal_ok` is set. A tile is not its own neighbour.
    pub fn is_neighbour(&self, other: &Self, diagonal_ok: bool) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        match (dx, dy) {
            (0, 1) | (1, 0) => true,
            (1, 1) => diagonal_ok,
            _ => false,
        }
    }

    pub fn is_diagonal_to(&self, other: &Self) -> bool {
        (self.x - other.x).abs() == 1 && (self.y - other.y).abs() == 1
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Linear interpolation, used for character positions between tile centres.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
