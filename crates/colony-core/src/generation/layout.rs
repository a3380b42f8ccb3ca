//! Scripted layouts for demos and pathfinding checks.

use crate::components::TileCoord;
use crate::engine::SimulationEngine;
use crate::error::WorldError;

use super::fill_floor;

/// Lays a 20x20 floor patch in the middle of the world with a walled
/// 10x10 enclosure. The enclosure is open on its east side and along one
/// row, so routes in or out must detour around the walls.
///
/// Needs a world at least 20 tiles on each side.
pub fn build_test_route(engine: &mut SimulationEngine) -> Result<(), WorldError> {
    let (width, height) = (engine.grid().width(), engine.grid().height());
    if width < 20 || height < 20 {
        return Err(WorldError::OutOfBounds {
            x: width - 1,
            y: height - 1,
        });
    }
    let left = width / 2 - 5;
    let bottom = height / 2 - 5;

    fill_floor(
        engine,
        TileCoord::new(left - 5, bottom - 5),
        TileCoord::new(left + 14, bottom + 14),
    )?;

    for y in bottom..=bottom + 9 {
        for x in left..=left + 9 {
            let on_edge = x == left || x == left + 9 || y == bottom || y == bottom + 9;
            let gap = x == left + 9 || y == bottom + 4;
            if on_edge && !gap {
                engine.place_furniture("Wall", TileCoord::new(x, y))?;
            }
        }
    }
    log::info!("Built test route around ({}, {})", left, bottom);
    Ok(())
}
