//! Dense tile storage.

use crate::components::{Tile, TileCoord, TileType};

/// Orthogonal offsets: N E S W.
pub const ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
/// Diagonal offsets: NE SE SW NW.
pub const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Allocates a grid of Empty tiles.
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as i32, height as i32);
        let mut tiles = Vec::with_capacity((width * height).max(0) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::new(TileCoord::new(x, y)));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y * self.width + coord.x) as usize)
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn tile_type(&self, coord: TileCoord) -> TileType {
        self.tile(coord).map(|t| t.tile_type).unwrap_or_default()
    }

    /// 0 outside the grid.
    pub fn movement_cost(&self, coord: TileCoord) -> f32 {
        self.tile(coord).map(Tile::movement_cost).unwrap_or(0.0)
    }

    /// Neighbours in N E S W order, then NE SE SW NW when `diagonal` is set.
    /// Off-grid entries are `None`.
    pub fn neighbours(&self, coord: TileCoord, diagonal: bool) -> Vec<Option<TileCoord>> {
        let offsets = ORTHOGONAL
            .iter()
            .chain(DIAGONAL.iter().take(if diagonal { 4 } else { 0 }));
        offsets
            .map(|&(dx, dy)| {
                let n = coord.offset(dx, dy);
                self.in_bounds(n).then_some(n)
            })
            .collect()
    }
}
