//! Tile-type painting.

use rand::Rng;

use crate::components::{TileCoord, TileType};
use crate::engine::SimulationEngine;
use crate::error::WorldError;

/// Flips every bare tile to Floor or Empty with equal odds. Tiles holding
/// furniture or a stack are left alone.
pub fn randomize_tiles(engine: &mut SimulationEngine, rng: &mut impl Rng) {
    let (width, height) = (engine.grid().width(), engine.grid().height());
    for y in 0..height {
        for x in 0..width {
            let coord = TileCoord::new(x, y);
            let tile_type = if rng.gen_bool(0.5) {
                TileType::Floor
            } else {
                TileType::Empty
            };
            // Occupied tiles refuse Empty; keep them as they are
            let _ = engine.set_tile_type(coord, tile_type);
        }
    }
    log::debug!("Randomized {}x{} tiles", width, height);
}

/// Sets every tile in the inclusive rectangle to Floor.
pub fn fill_floor(
    engine: &mut SimulationEngine,
    from: TileCoord,
    to: TileCoord,
) -> Result<(), WorldError> {
    for y in from.y.min(to.y)..=from.y.max(to.y) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            engine.set_tile_type(TileCoord::new(x, y), TileType::Floor)?;
        }
    }
    Ok(())
}
