//! Save/Load for the tile world.
//!
//! Uses bincode over a flat snapshot: tiles, room gases, furniture with
//! their parameters, characters and floor stacks. Jobs and carried stacks
//! are not saved; a loaded colony starts with an empty queue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::catalog::FurnitureCatalog;
use crate::components::*;
use crate::config::SimConfig;
use crate::engine::SimulationEngine;
pub use crate::error::SaveError;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub sim_time: f64,
    pub width: u32,
    pub height: u32,
    /// Every Floor tile; anything absent is Empty
    pub tiles: Vec<SavedTile>,
    pub rooms: Vec<SavedRoom>,
    pub furniture: Vec<SavedFurniture>,
    pub characters: Vec<SavedCharacter>,
    /// Stacks lying on tiles
    pub stacks: Vec<SavedStack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTile {
    pub x: i32,
    pub y: i32,
    pub tile_type: TileType,
    pub room: Option<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRoom {
    pub id: RoomId,
    pub gases: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFurniture {
    pub x: i32,
    pub y: i32,
    pub kind: String,
    pub params: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCharacter {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStack {
    pub x: i32,
    pub y: i32,
    pub kind: String,
    pub stack_size: u32,
    pub max_stack_size: u32,
}

impl SaveData {
    /// Captures the engine's current state.
    pub fn capture(engine: &SimulationEngine) -> Self {
        let grid = engine.grid();
        let tiles = grid
            .tiles()
            .filter(|t| !t.is_empty())
            .map(|t| SavedTile {
                x: t.coord.x,
                y: t.coord.y,
                tile_type: t.tile_type,
                room: t.room,
            })
            .collect();

        let rooms = engine
            .rooms()
            .enclosed()
            .map(|room| SavedRoom {
                id: room.id,
                gases: room.gases().clone(),
            })
            .collect();

        let furniture = engine
            .furniture_entities()
            .iter()
            .filter_map(|e| engine.world.get::<&Furniture>(*e).ok())
            .map(|f| SavedFurniture {
                x: f.anchor.x,
                y: f.anchor.y,
                kind: f.kind.clone(),
                params: f.parameters(),
            })
            .collect();

        let characters = engine
            .characters()
            .iter()
            .filter_map(|e| engine.character(*e))
            .map(|ch| SavedCharacter {
                x: ch.current.x,
                y: ch.current.y,
            })
            .collect();

        let stacks = engine
            .inventory()
            .iter()
            .filter_map(|(_, stack)| {
                let at = stack.tile()?;
                Some(SavedStack {
                    x: at.x,
                    y: at.y,
                    kind: stack.kind.clone(),
                    stack_size: stack.stack_size,
                    max_stack_size: stack.max_stack_size,
                })
            })
            .collect();

        Self {
            version: SAVE_VERSION,
            sim_time: engine.sim_time,
            width: grid.width() as u32,
            height: grid.height() as u32,
            tiles,
            rooms,
            furniture,
            characters,
            stacks,
        }
    }

    /// Rebuilds an engine from this snapshot. The grid takes the saved
    /// size; everything else in `config` is kept.
    pub fn rebuild(
        &self,
        mut config: SimConfig,
        catalog: FurnitureCatalog,
    ) -> Result<SimulationEngine, SaveError> {
        config.width = self.width;
        config.height = self.height;
        let mut engine = SimulationEngine::new(config, catalog);
        engine.sim_time = self.sim_time;

        for tile in &self.tiles {
            engine.set_tile_type(TileCoord::new(tile.x, tile.y), tile.tile_type)?;
        }
        for saved in &self.furniture {
            let entity = engine.place_furniture(&saved.kind, TileCoord::new(saved.x, saved.y))?;
            if let Ok(mut furn) = engine.world.get::<&mut Furniture>(entity) {
                for (name, value) in &saved.params {
                    furn.set_parameter(name, *value);
                }
            }
        }

        let ids: BTreeMap<TileCoord, RoomId> = self
            .tiles
            .iter()
            .filter_map(|t| Some((TileCoord::new(t.x, t.y), t.room?)))
            .collect();
        let gases: BTreeMap<RoomId, BTreeMap<String, f32>> = self
            .rooms
            .iter()
            .map(|r| (r.id, r.gases.clone()))
            .collect();
        engine.restore_rooms(&ids, &gases);

        for ch in &self.characters {
            engine.spawn_character(TileCoord::new(ch.x, ch.y))?;
        }
        for stack in &self.stacks {
            let load = Inventory::new(stack.kind.clone(), stack.max_stack_size, stack.stack_size);
            engine.restore_stack(TileCoord::new(stack.x, stack.y), load)?;
        }
        Ok(engine)
    }
}

/// Save simulation state to a writer
pub fn save_simulation<W: Write>(writer: W, engine: &SimulationEngine) -> Result<(), SaveError> {
    let data = SaveData::capture(engine);
    bincode::serialize_into(writer, &data)?;
    log::info!(
        "Saved {}x{} world: {} furniture, {} characters, {} stacks",
        data.width,
        data.height,
        data.furniture.len(),
        data.characters.len(),
        data.stacks.len()
    );
    Ok(())
}

/// Read a snapshot, checking the format version
pub fn load_simulation<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    let data: SaveData = bincode::deserialize_from(reader)?;
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}
