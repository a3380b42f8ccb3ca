//! Stack registry and transfers.
//!
//! Every transfer moves as much as fits in the destination, leaves the rest
//! on the source, and retires the source if it reached zero. A zero-sized
//! stack never stays registered or attached to an owner.

use std::collections::BTreeMap;

use hecs::Entity;
use slotmap::SlotMap;

use crate::components::{Inventory, Job, StackId, StackOwner, TileCoord};
use crate::config::SupplySearch;
use crate::error::InventoryError;
use crate::events::{EventBus, SimEvent};
use crate::grid::Grid;

#[derive(Debug, Default)]
pub struct InventoryManager {
    stacks: SlotMap<StackId, Inventory>,
    by_kind: BTreeMap<String, Vec<StackId>>,
}

impl InventoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self, id: StackId) -> Option<&Inventory> {
        self.stacks.get(id)
    }

    /// Live stacks of `kind`, in registration order.
    pub fn stacks_of_kind(&self, kind: &str) -> &[StackId] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StackId, &Inventory)> {
        self.stacks.iter()
    }

    pub fn total_of_kind(&self, kind: &str) -> u32 {
        self.stacks_of_kind(kind)
            .iter()
            .filter_map(|id| self.stacks.get(*id))
            .map(|s| s.stack_size)
            .sum()
    }

    fn register(&mut self, stack: Inventory) -> StackId {
        let kind = stack.kind.clone();
        let id = self.stacks.insert(stack);
        self.by_kind.entry(kind).or_default().push(id);
        id
    }

    fn unregister(&mut self, id: StackId) -> Option<Inventory> {
        let stack = self.stacks.remove(id)?;
        if let Some(ids) = self.by_kind.get_mut(&stack.kind) {
            ids.retain(|s| *s != id);
            if ids.is_empty() {
                self.by_kind.remove(&stack.kind);
            }
        }
        Some(stack)
    }

    /// Retires a used-up stack, clearing its tile back-reference. Returns
    /// the former owner so a character owner can clear its own slot.
    pub fn remove_if_empty(&mut self, grid: &mut Grid, id: StackId) -> Option<StackOwner> {
        if self.stacks.get(id).map(|s| s.stack_size > 0).unwrap_or(true) {
            return None;
        }
        let owner = self.unregister(id)?.owner;
        if let Some(StackOwner::Tile(coord)) = owner {
            if let Some(tile) = grid.tile_mut(coord) {
                if tile.inventory == Some(id) {
                    tile.inventory = None;
                }
            }
        }
        owner
    }

    /// Moves `source` onto a tile, merging into a same-kind stack already
    /// there. `source` keeps whatever did not fit.
    pub fn spawn_on_tile(
        &mut self,
        grid: &mut Grid,
        coord: TileCoord,
        source: &mut Inventory,
        events: &mut EventBus,
    ) -> Result<StackId, InventoryError> {
        if source.stack_size == 0 {
            return Err(InventoryError::EmptyStack);
        }
        let tile = grid
            .tile_mut(coord)
            .filter(|t| t.is_walkable())
            .ok_or(InventoryError::InvalidTile {
                x: coord.x,
                y: coord.y,
            })?;

        match tile.inventory {
            None => {
                let mut stack = source.clone();
                stack.owner = Some(StackOwner::Tile(coord));
                source.stack_size = 0;
                let id = self.register(stack);
                tile.inventory = Some(id);
                events.emit(SimEvent::InventoryCreated(id));
                Ok(id)
            }
            Some(existing) => {
                let dst = self
                    .stacks
                    .get_mut(existing)
                    .ok_or(InventoryError::UnknownStack)?;
                let moved = fits(dst, &source.kind, source.stack_size)?;
                dst.stack_size += moved;
                source.stack_size -= moved;
                events.emit(SimEvent::InventoryChanged(existing));
                Ok(existing)
            }
        }
    }

    /// Puts a carried stack down on a tile. Returns the amount moved.
    pub fn place_on_tile(
        &mut self,
        grid: &mut Grid,
        coord: TileCoord,
        carried: &mut Option<StackId>,
        events: &mut EventBus,
    ) -> Result<u32, InventoryError> {
        let src_id = carried.ok_or(InventoryError::UnknownStack)?;
        let (kind, size) = self
            .stacks
            .get(src_id)
            .map(|s| (s.kind.clone(), s.stack_size))
            .ok_or(InventoryError::UnknownStack)?;
        let tile = grid
            .tile_mut(coord)
            .filter(|t| t.is_walkable())
            .ok_or(InventoryError::InvalidTile {
                x: coord.x,
                y: coord.y,
            })?;

        let Some(dst_id) = tile.inventory else {
            tile.inventory = Some(src_id);
            if let Some(stack) = self.stacks.get_mut(src_id) {
                stack.owner = Some(StackOwner::Tile(coord));
            }
            *carried = None;
            events.emit(SimEvent::InventoryChanged(src_id));
            return Ok(size);
        };

        let dst = self
            .stacks
            .get_mut(dst_id)
            .ok_or(InventoryError::UnknownStack)?;
        let moved = fits(dst, &kind, size)?;
        dst.stack_size += moved;
        self.drain(grid, src_id, moved, carried, events);
        events.emit(SimEvent::InventoryChanged(dst_id));
        Ok(moved)
    }

    /// Hands carried materials over to a job's requirement.
    pub fn deliver_to_job(
        &mut self,
        grid: &mut Grid,
        job: &mut Job,
        carried: &mut Option<StackId>,
        events: &mut EventBus,
    ) -> Result<u32, InventoryError> {
        let src_id = carried.ok_or(InventoryError::UnknownStack)?;
        let (kind, size) = self
            .stacks
            .get(src_id)
            .map(|s| (s.kind.clone(), s.stack_size))
            .ok_or(InventoryError::UnknownStack)?;
        let req = job
            .requirements
            .get_mut(&kind)
            .ok_or_else(|| InventoryError::NoRequirement(kind.clone()))?;

        let moved = fits(req, &kind, size)?;
        req.stack_size += moved;
        self.drain(grid, src_id, moved, carried, events);
        Ok(moved)
    }

    /// Moves up to `amount` from the stack on `coord` into the character's
    /// hands.
    pub fn pick_up(
        &mut self,
        grid: &mut Grid,
        coord: TileCoord,
        who: Entity,
        carried: &mut Option<StackId>,
        amount: u32,
        events: &mut EventBus,
    ) -> Result<u32, InventoryError> {
        let src_id = grid
            .tile(coord)
            .and_then(|t| t.inventory)
            .ok_or(InventoryError::UnknownStack)?;
        let src = self
            .stacks
            .get(src_id)
            .cloned()
            .ok_or(InventoryError::UnknownStack)?;

        let moved = match *carried {
            None => {
                let moved = amount.min(src.stack_size).min(src.max_stack_size);
                if moved == 0 {
                    return Err(InventoryError::EmptyStack);
                }
                let mut held = Inventory::new(src.kind.clone(), src.max_stack_size, moved);
                held.owner = Some(StackOwner::Character(who));
                let id = self.register(held);
                *carried = Some(id);
                events.emit(SimEvent::InventoryCreated(id));
                moved
            }
            Some(held_id) => {
                let held = self
                    .stacks
                    .get_mut(held_id)
                    .ok_or(InventoryError::UnknownStack)?;
                let moved = fits(held, &src.kind, amount.min(src.stack_size))?;
                held.stack_size += moved;
                events.emit(SimEvent::InventoryChanged(held_id));
                moved
            }
        };

        let mut tile_slot = Some(src_id);
        self.drain(grid, src_id, moved, &mut tile_slot, events);
        Ok(moved)
    }

    /// Takes `amount` off a source stack, retiring it at zero. `slot` is the
    /// owner's handle and is cleared when the stack goes away.
    fn drain(
        &mut self,
        grid: &mut Grid,
        id: StackId,
        amount: u32,
        slot: &mut Option<StackId>,
        events: &mut EventBus,
    ) {
        if let Some(stack) = self.stacks.get_mut(id) {
            stack.stack_size = stack.stack_size.saturating_sub(amount);
        }
        events.emit(SimEvent::InventoryChanged(id));
        if self.remove_if_empty(grid, id).is_some() && *slot == Some(id) {
            *slot = None;
        }
    }

    /// A stack of `kind` lying on a tile and accepted by `admissible`.
    pub fn closest_of_kind(
        &self,
        kind: &str,
        from: TileCoord,
        policy: SupplySearch,
        admissible: impl Fn(&Inventory) -> bool,
    ) -> Option<StackId> {
        let mut candidates = self
            .stacks_of_kind(kind)
            .iter()
            .filter_map(|id| self.stacks.get(*id).map(|s| (*id, s)))
            .filter(|(_, s)| s.stack_size > 0 && s.tile().is_some() && admissible(*s));

        match policy {
            SupplySearch::FirstMatch => candidates.next().map(|(id, _)| id),
            SupplySearch::Nearest => candidates
                .filter_map(|(id, s)| s.tile().map(|t| (id, t.distance(&from))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id),
        }
    }
}

/// How much of a `kind` source of `size` fits into `dst`.
fn fits(dst: &Inventory, kind: &str, size: u32) -> Result<u32, InventoryError> {
    if dst.kind != kind {
        return Err(InventoryError::KindMismatch {
            expected: dst.kind.clone(),
            found: kind.to_string(),
        });
    }
    let moved = dst.space_left().min(size);
    if moved == 0 {
        return Err(InventoryError::StackFull);
    }
    Ok(moved)
}
