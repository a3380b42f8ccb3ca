//! Per-tick furniture behaviour: doors, stockpiles and gas generators.

use hecs::Entity;

use super::{Announce, InventoryManager, JobQueue, JobSignal, RoomSet};
use crate::components::{
    Behavior, DoorState, Enterability, Furniture, GasGenerator, Job, JobPurpose, StockpileState,
    TileCoord,
};
use crate::config::SimConfig;
use crate::events::{EventBus, SimEvent};
use crate::grid::Grid;

pub(crate) struct FurnitureContext<'a> {
    pub grid: &'a Grid,
    pub rooms: &'a mut RoomSet,
    pub jobs: &'a mut JobQueue,
    pub inventory: &'a InventoryManager,
    pub config: &'a SimConfig,
    pub events: &'a mut EventBus,
    pub signals: &'a mut Vec<JobSignal>,
}

pub(crate) fn tick_furniture(
    entity: Entity,
    furn: &mut Furniture,
    ctx: &mut FurnitureContext<'_>,
    dt: f32,
) {
    let anchor = furn.anchor;
    let changed = match &mut furn.behavior {
        Behavior::None => false,
        Behavior::Door(door) => update_door(door, ctx.config.door_open_rate, dt),
        Behavior::Stockpile(pile) => {
            update_stockpile(entity, anchor, pile, ctx);
            false
        }
        Behavior::GasGenerator(gen) => {
            update_gas_generator(anchor, gen, ctx, dt);
            false
        }
    };
    if changed {
        ctx.events.emit(SimEvent::FurnitureChanged(entity));
    }
}

/// Opens while `is_opening` is set, closes otherwise. Returns true when the
/// door state changed.
pub fn update_door(door: &mut DoorState, rate: f32, dt: f32) -> bool {
    let before = *door;
    if door.is_opening {
        door.openness += rate * dt;
        if door.openness >= 1.0 {
            door.is_opening = false;
        }
    } else {
        door.openness -= rate * dt;
    }
    door.openness = door.openness.clamp(0.0, 1.0);
    *door != before
}

/// A character wants through: start opening, let them pass once fully open.
pub fn poll_door(door: &mut DoorState) -> Enterability {
    door.is_opening = true;
    if door.openness >= 1.0 {
        Enterability::Yes
    } else {
        Enterability::Soon
    }
}

/// Enterability of `coord`, polling any door installed there. The door's
/// next update reports the change.
pub(crate) fn enterability(grid: &Grid, entities: &hecs::World, coord: TileCoord) -> Enterability {
    let Some(tile) = grid.tile(coord) else {
        return Enterability::Never;
    };
    if !tile.is_walkable() {
        return Enterability::Never;
    }
    let Some(installed) = tile.furniture else {
        return Enterability::Yes;
    };
    let Ok(mut furn) = entities.get::<&mut Furniture>(installed.entity) else {
        return Enterability::Yes;
    };
    match &mut furn.behavior {
        Behavior::Door(door) => poll_door(door),
        _ => Enterability::Yes,
    }
}

/// True when a stockpile is installed on `coord`.
pub(crate) fn stockpile_at(grid: &Grid, entities: &hecs::World, coord: TileCoord) -> bool {
    grid.tile(coord)
        .and_then(|t| t.furniture)
        .and_then(|f| entities.get::<&Furniture>(f.entity).ok())
        .map(|f| f.is_stockpile())
        .unwrap_or(false)
}

/// Keeps exactly one haul job open while the pile has room, asking for
/// whatever kind the pile already holds.
fn update_stockpile(
    entity: Entity,
    anchor: TileCoord,
    pile: &mut StockpileState,
    ctx: &mut FurnitureContext<'_>,
) {
    if let Some(job) = pile.demand_job {
        if ctx.jobs.get(job).is_none() {
            pile.demand_job = None;
        }
    }

    let held = ctx
        .grid
        .tile(anchor)
        .and_then(|t| t.inventory)
        .and_then(|id| ctx.inventory.stack(id));
    if let (Some(stack), Some(job)) = (held, pile.demand_job) {
        let stale = ctx
            .jobs
            .get(job)
            .map(|j| !j.requirements.contains_key(&stack.kind))
            .unwrap_or(false);
        if stale {
            log::debug!("Stockpile at {} now holds {}, dropping demand", anchor, stack.kind);
            pile.demand_job = None;
            ctx.signals.push(JobSignal::Cancel(job));
        }
    }
    let (kind, wanted) = match held {
        Some(stack) if stack.is_full() => {
            if let Some(job) = pile.demand_job.take() {
                ctx.signals.push(JobSignal::Cancel(job));
            }
            return;
        }
        Some(stack) => (stack.kind.clone(), stack.space_left()),
        None => (pile.item.clone(), pile.max_stack),
    };
    if pile.demand_job.is_some() || wanted == 0 {
        return;
    }

    let job = Job::new(anchor, JobPurpose::Haul { stockpile: entity }, 0.0)
        .with_requirement(&kind, wanted)
        .from_stockpile(false);
    let id = ctx.jobs.add(job);
    ctx.jobs.enqueue(id, Announce::New, ctx.events);
    pile.demand_job = Some(id);
    log::debug!("Stockpile at {} requests {} {}", anchor, wanted, kind);
}

fn update_gas_generator(
    anchor: TileCoord,
    gen: &GasGenerator,
    ctx: &mut FurnitureContext<'_>,
    dt: f32,
) {
    let Some(room_id) = ctx.grid.tile(anchor).and_then(|t| t.room) else {
        return;
    };
    let Some(room) = ctx.rooms.get_mut(room_id) else {
        return;
    };
    if room.id.is_outside() {
        return;
    }
    let level = room.gas(&gen.gas);
    if level < gen.ceiling {
        room.change_gas(&gen.gas, (gen.rate * dt).min(gen.ceiling - level));
    }
}
