//! Character state machine: take a job, gather its materials, walk there,
//! work it.
//!
//! Each tick runs the job step, then the movement step. Job side effects
//! that reach outside this character (installing furniture, filling a
//! stockpile) are pushed as [`JobSignal`]s for the engine to settle.

use hecs::Entity;

use super::{
    enterability, release_tiles, stockpile_at, Announce, InventoryManager, JobQueue, JobSignal,
    PathCache, TilePath,
};
use crate::components::{Character, CharacterState, Enterability, Inventory, JobId, JobStep};
use crate::config::SimConfig;
use crate::events::{EventBus, SimEvent};
use crate::grid::Grid;

pub(crate) struct CharacterContext<'a> {
    pub grid: &'a mut Grid,
    pub jobs: &'a mut JobQueue,
    pub inventory: &'a mut InventoryManager,
    pub paths: &'a mut PathCache,
    pub entities: &'a hecs::World,
    pub config: &'a SimConfig,
    pub events: &'a mut EventBus,
    pub signals: &'a mut Vec<JobSignal>,
}

/// Advances one character. Returns true when its position or state changed.
pub(crate) fn tick_character(
    me: Entity,
    ch: &mut Character,
    ctx: &mut CharacterContext<'_>,
    dt: f32,
) -> bool {
    let before = (ch.current, ch.next, ch.progress, ch.state, ch.carrying);
    ch.tick_cooldowns(dt);
    update_job(me, ch, ctx, dt);
    update_movement(me, ch, ctx, dt);
    before != (ch.current, ch.next, ch.progress, ch.state, ch.carrying)
}

fn update_job(me: Entity, ch: &mut Character, ctx: &mut CharacterContext<'_>, dt: f32) {
    let id = match ch.job {
        Some(id) => id,
        None => {
            let cooling: Vec<JobId> = ch.cooldowns.iter().map(|(id, _)| *id).collect();
            match ctx.jobs.dequeue_where(me, |id, _| !cooling.contains(&id)) {
                Some(id) => {
                    log::debug!("{:?} took job {:?}", me, id);
                    ch.job = Some(id);
                    ch.state = CharacterState::Seeking;
                    id
                }
                None => {
                    ch.state = CharacterState::Idle;
                    return;
                }
            }
        }
    };

    let Some(job) = ctx.jobs.get(id) else {
        ch.job = None;
        ch.state = CharacterState::Idle;
        ch.halt();
        return;
    };
    let job_tile = job.tile;
    let stand_on_tile = job.stand_on_tile;

    if !job.requirements_met() {
        let carried_kind = ch
            .carrying
            .and_then(|s| ctx.inventory.stack(s))
            .map(|s| s.kind.clone());
        match carried_kind {
            Some(kind) if job.needs(&kind) => {
                if ch.current == job_tile && ch.next == ch.current {
                    deliver(ch, ctx, id);
                    work(ch, ctx, id, dt);
                } else {
                    ch.set_destination(job_tile, true);
                    ch.state = CharacterState::Delivering;
                }
            }
            Some(_) => drop_carried(me, ch, ctx),
            None => fetch(me, ch, ctx, id),
        }
        return;
    }

    let in_range = ch.next == ch.current
        && (ch.current == job_tile
            || (!stand_on_tile && ch.current.is_neighbour(&job_tile, true)));
    if in_range {
        ch.destination = ch.current;
        ch.path = None;
        ch.state = CharacterState::Working;
        work(ch, ctx, id, dt);
    } else {
        ch.set_destination(job_tile, stand_on_tile);
        ch.state = CharacterState::Seeking;
    }
}

fn deliver(ch: &mut Character, ctx: &mut CharacterContext<'_>, id: JobId) {
    let Some(job) = ctx.jobs.get_mut(id) else {
        return;
    };
    match ctx
        .inventory
        .deliver_to_job(ctx.grid, job, &mut ch.carrying, ctx.events)
    {
        Ok(moved) => log::debug!("Delivered {} to job {:?}", moved, id),
        Err(e) => log::warn!("Delivery to job {:?} failed: {}", id, e),
    }
}

fn work(ch: &mut Character, ctx: &mut CharacterContext<'_>, id: JobId, dt: f32) {
    let Some(job) = ctx.jobs.get_mut(id) else {
        return;
    };
    let step = job.do_work(dt);
    ctx.events.emit(SimEvent::JobWorked(id));
    ctx.signals.push(JobSignal::Worked(id));

    if let JobStep::Completed { repeats } = step {
        ctx.signals.push(JobSignal::Completed(id));
        if !repeats {
            ch.job = None;
            ch.state = CharacterState::Idle;
        }
    }
}

/// Finds material for the job: picks it up if it is underfoot, otherwise
/// walks to it. Abandons the job when nothing suitable exists.
fn fetch(me: Entity, ch: &mut Character, ctx: &mut CharacterContext<'_>, id: JobId) {
    let Some(job) = ctx.jobs.get(id) else {
        return;
    };
    let job_tile = job.tile;
    let allow_stockpile = job.can_take_from_stockpile;
    let wanted: Vec<(String, u32)> = job
        .unmet()
        .map(|req| (req.kind.clone(), req.space_left()))
        .collect();

    let grid: &Grid = ctx.grid;
    let entities = ctx.entities;
    let admissible = |s: &Inventory| {
        let Some(at) = s.tile() else {
            return false;
        };
        let reachable = grid.tile(at).map(|t| t.is_walkable()).unwrap_or(false);
        reachable && (allow_stockpile || !stockpile_at(grid, entities, at))
    };
    let underfoot = grid.tile(ch.current).and_then(|t| t.inventory);

    let mut choice = None;
    for (kind, amount) in &wanted {
        let here = underfoot
            .and_then(|s| ctx.inventory.stack(s).map(|stack| (s, stack)))
            .filter(|(_, stack)| stack.kind == *kind && admissible(*stack))
            .map(|(s, _)| s);
        let found = here.or_else(|| {
            ctx.inventory
                .closest_of_kind(kind, ch.current, ctx.config.supply_search, admissible)
        });
        if let Some(stack) = found {
            choice = Some((stack, *amount));
            break;
        }
    }

    let Some((stack, amount)) = choice else {
        log::warn!("{:?}: no supply for job at {}", me, job_tile);
        abandon(me, ch, ctx, true);
        return;
    };
    let Some(supply_tile) = ctx.inventory.stack(stack).and_then(Inventory::tile) else {
        return;
    };

    if supply_tile == ch.current && ch.next == ch.current {
        match ctx
            .inventory
            .pick_up(ctx.grid, supply_tile, me, &mut ch.carrying, amount, ctx.events)
        {
            Ok(_) => {
                ch.set_destination(job_tile, true);
                ch.state = CharacterState::Delivering;
            }
            Err(e) => log::warn!("{:?}: pick up at {} failed: {}", me, supply_tile, e),
        }
    } else {
        ch.set_destination(supply_tile, true);
        ch.state = CharacterState::Fetching;
    }
}

/// Puts down an item the job does not need: here, or on the first
/// orthogonal neighbour that takes it. Tiles awaiting construction are
/// skipped.
fn drop_carried(me: Entity, ch: &mut Character, ctx: &mut CharacterContext<'_>) {
    let mut spots = vec![ch.current];
    spots.extend(ctx.grid.neighbours(ch.current, false).into_iter().flatten());
    for spot in spots {
        if ch.carrying.is_none() {
            break;
        }
        let claimed = ctx
            .grid
            .tile(spot)
            .map(|t| t.pending_furniture_job.is_some())
            .unwrap_or(false);
        if claimed {
            log::debug!("{:?}: not dropping on {}, a job is pending there", me, spot);
            continue;
        }
        match ctx
            .inventory
            .place_on_tile(ctx.grid, spot, &mut ch.carrying, ctx.events)
        {
            Ok(moved) => log::debug!("{:?}: dropped {} on {}", me, moved, spot),
            Err(e) => log::debug!("{:?}: cannot drop on {}: {}", me, spot, e),
        }
    }
    if ch.carrying.is_some() {
        log::warn!("{:?}: nowhere to drop carried items near {}", me, ch.current);
    }
}

/// Gives the job back to the queue. With `cooldown` set this character
/// ignores it for a while.
pub(crate) fn abandon(me: Entity, ch: &mut Character, ctx: &mut CharacterContext<'_>, cooldown: bool) {
    let Some(id) = ch.job.take() else {
        return;
    };
    ch.halt();
    ch.state = CharacterState::Idle;

    if let Some(job) = ctx.jobs.get(id) {
        release_tiles(ctx.grid, id, job);
    }
    ctx.jobs.release(id);
    ctx.jobs.enqueue(id, Announce::Silent, ctx.events);
    if cooldown {
        ch.cooldowns.push((id, ctx.config.unreachable_cooldown));
    }
    log::debug!("{:?} abandoned job {:?}", me, id);
}

fn update_movement(me: Entity, ch: &mut Character, ctx: &mut CharacterContext<'_>, dt: f32) {
    if ch.current == ch.destination {
        ch.path = None;
        ch.next = ch.current;
        ch.progress = 0.0;
        return;
    }

    if ch.next == ch.current {
        if ch.path.is_none() {
            match ctx
                .paths
                .find_path(ctx.grid, ch.current, ch.destination, ch.end_on_tile)
            {
                Some(path) => ch.path = Some(path),
                None => {
                    log::warn!(
                        "{:?}: no path from {} to {}",
                        me,
                        ch.current,
                        ch.destination
                    );
                    if ch.job.is_some() {
                        abandon(me, ch, ctx, true);
                    } else {
                        ch.halt();
                    }
                    return;
                }
            }
        }
        match ch.path.as_mut().and_then(TilePath::next_tile) {
            Some(next) => ch.next = next,
            None => {
                // Path used up beside an unreachable destination.
                ch.path = None;
                ch.destination = ch.current;
                return;
            }
        }
    }

    match enterability(ctx.grid, ctx.entities, ch.next) {
        Enterability::Yes => {}
        Enterability::Soon => return,
        Enterability::Never => {
            ch.next = ch.current;
            ch.path = None;
            ch.progress = 0.0;
            return;
        }
    }

    let distance = ch.current.distance(&ch.next);
    let cost = ctx.grid.movement_cost(ch.next);
    if distance <= 0.0 || cost <= 0.0 {
        ch.next = ch.current;
        return;
    }
    ch.progress += ch.speed / cost * dt / distance;
    if ch.progress >= 1.0 {
        ch.current = ch.next;
        ch.progress = 0.0;
    }
}
