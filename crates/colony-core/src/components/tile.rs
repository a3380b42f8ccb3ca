//! Grid cell state.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{JobId, RoomId, StackId, TileCoord};

/// Base type of a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Empty,
    Floor,
}

/// Answer to "may a character step onto this tile now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enterability {
    Yes,
    Never,
    /// Not yet; poll again next tick (a door that is still opening).
    Soon,
}

/// Furniture installed on a tile. Cost and border flag are cached here at
/// install time so the path graph and room fill never touch the ECS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Installed {
    pub entity: Entity,
    pub movement_cost: f32,
    pub room_border: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub coord: TileCoord,
    pub tile_type: TileType,
    pub furniture: Option<Installed>,
    pub inventory: Option<StackId>,
    pub room: Option<RoomId>,
    /// Build or deconstruct job already ordered for this tile.
    pub pending_furniture_job: Option<JobId>,
}

impl Tile {
    pub fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            tile_type: TileType::Empty,
            furniture: None,
            inventory: None,
            room: None,
            pending_furniture_job: None,
        }
    }

    /// 0 for Empty tiles, otherwise the base cost scaled by any furniture.
    pub fn movement_cost(&self) -> f32 {
        if self.tile_type == TileType::Empty {
            return 0.0;
        }
        match &self.furniture {
            Some(installed) => installed.movement_cost,
            None => 1.0,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.movement_cost() > 0.0
    }

    pub fn is_room_border(&self) -> bool {
        self.furniture.map(|f| f.room_border).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.tile_type == TileType::Empty
    }
}
