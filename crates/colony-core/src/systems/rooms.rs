//! Room partitioning.
//!
//! Placing a border furniture may split a room (flood fill from the
//! neighbours of the new border); removing one merges the rooms it used to
//! separate. The outside room is the unenclosed region and always exists.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::components::{Room, RoomId, TileCoord, TileType};
use crate::events::{EventBus, SimEvent};
use crate::grid::Grid;

#[derive(Debug, Clone)]
pub struct RoomSet {
    rooms: BTreeMap<RoomId, Room>,
    next_id: u32,
}

impl Default for RoomSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomSet {
    pub fn new() -> Self {
        let mut rooms = BTreeMap::new();
        rooms.insert(RoomId::OUTSIDE, Room::new(RoomId::OUTSIDE));
        Self { rooms, next_id: 1 }
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn outside(&self) -> Option<&Room> {
        self.rooms.get(&RoomId::OUTSIDE)
    }

    /// Number of rooms, outside included.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Enclosed rooms only.
    pub fn enclosed(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values().filter(|r| !r.id.is_outside())
    }

    fn create(&mut self, events: &mut EventBus) -> RoomId {
        let id = RoomId(self.next_id);
        self.next_id += 1;
        self.rooms.insert(id, Room::new(id));
        events.emit(SimEvent::RoomCreated(id));
        id
    }

    fn delete(&mut self, id: RoomId, events: &mut EventBus) {
        if id.is_outside() {
            return;
        }
        if let Some(room) = self.rooms.remove(&id) {
            if room.size() > 0 {
                log::error!("{} deleted while still holding {} tiles", id, room.size());
                debug_assert!(room.size() == 0, "{id} deleted while holding tiles");
            }
            events.emit(SimEvent::RoomDeleted(id));
        }
    }

    /// Moves a tile into `room`, leaving whatever room it was in.
    pub fn assign(&mut self, grid: &mut Grid, coord: TileCoord, room: RoomId) {
        self.unassign(grid, coord);
        if let Some(tile) = grid.tile_mut(coord) {
            tile.room = Some(room);
        }
        if let Some(r) = self.rooms.get_mut(&room) {
            r.tiles.insert(coord);
        }
    }

    pub fn unassign(&mut self, grid: &mut Grid, coord: TileCoord) {
        let Some(tile) = grid.tile_mut(coord) else {
            return;
        };
        if let Some(old) = tile.room.take() {
            if let Some(r) = self.rooms.get_mut(&old) {
                r.tiles.remove(&coord);
            }
        }
    }

    /// Folds `source` into `target`: weighted gas average, then every tile
    /// moves over and `source` is deleted.
    fn merge(&mut self, grid: &mut Grid, target: RoomId, source: RoomId, events: &mut EventBus) {
        if target == source || source.is_outside() {
            return;
        }
        let Some(src) = self.rooms.get(&source).cloned() else {
            return;
        };
        if let Some(dst) = self.rooms.get_mut(&target) {
            dst.merge_from(&src);
        }
        for coord in src.tiles() {
            self.assign(grid, *coord, target);
        }
        self.delete(source, events);
    }

    /// A border furniture was installed on `coord`.
    pub fn on_border_placed(&mut self, grid: &mut Grid, coord: TileCoord, events: &mut EventBus) {
        let Some(old) = grid.tile(coord).and_then(|t| t.room) else {
            return;
        };
        let neighbours: Vec<TileCoord> = grid.neighbours(coord, true).into_iter().flatten().collect();
        let borders = neighbours
            .iter()
            .filter(|n| grid.tile(**n).map(|t| t.is_room_border()).unwrap_or(false))
            .count();

        if borders < 2 {
            self.unassign(grid, coord);
            return;
        }

        let mut escaped = HashSet::new();
        for n in neighbours {
            self.fill_from(grid, n, old, &mut escaped, events);
        }

        self.unassign(grid, coord);
        self.delete(old, events);
    }

    /// Flood fill from `seed` through tiles still in `old`. An enclosed fill
    /// becomes a new room; a fill that reaches Empty or the edge is outside.
    fn fill_from(
        &mut self,
        grid: &mut Grid,
        seed: TileCoord,
        old: RoomId,
        escaped: &mut HashSet<TileCoord>,
        events: &mut EventBus,
    ) {
        let Some(tile) = grid.tile(seed) else {
            return;
        };
        if tile.room != Some(old) || tile.is_room_border() || tile.is_empty() {
            return;
        }
        if escaped.contains(&seed) {
            return;
        }

        let mut members = Vec::new();
        let mut seen = HashSet::from([seed]);
        let mut queue = VecDeque::from([seed]);
        let mut leaked = false;

        while let Some(current) = queue.pop_front() {
            members.push(current);
            for n in grid.neighbours(current, false) {
                let Some(n) = n else {
                    leaked = true;
                    continue;
                };
                let Some(t) = grid.tile(n) else {
                    continue;
                };
                if t.tile_type == TileType::Empty {
                    leaked = true;
                    continue;
                }
                if t.room == Some(old) && !t.is_room_border() && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }

        if leaked {
            if !old.is_outside() {
                for coord in &members {
                    self.assign(grid, *coord, RoomId::OUTSIDE);
                }
            }
            escaped.extend(members);
            return;
        }

        let id = self.create(events);
        if let Some(src) = self.rooms.get(&old).cloned() {
            if let Some(room) = self.rooms.get_mut(&id) {
                room.copy_gases_from(&src);
            }
        }
        for coord in members {
            self.assign(grid, coord, id);
        }
        log::debug!("Flood fill from {} enclosed {}", seed, id);
    }

    /// A border furniture was removed from `coord`.
    pub fn on_border_removed(&mut self, grid: &mut Grid, coord: TileCoord, events: &mut EventBus) {
        if grid.tile_type(coord) == TileType::Empty {
            return;
        }
        let mut candidates = BTreeSet::new();
        let mut open_to_void = false;
        for n in grid.neighbours(coord, false) {
            match n.and_then(|n| grid.tile(n)) {
                None => open_to_void = true,
                Some(t) if t.tile_type == TileType::Empty => open_to_void = true,
                Some(t) => {
                    if let Some(room) = t.room {
                        candidates.insert(room);
                    }
                }
            }
        }
        if open_to_void {
            candidates.insert(RoomId::OUTSIDE);
        }

        let target = match candidates.iter().next() {
            Some(lowest) => *lowest,
            None => self.create(events),
        };
        for other in candidates.into_iter().skip(1) {
            self.merge(grid, target, other, events);
        }
        self.assign(grid, coord, target);
    }

    /// A tile's base type changed.
    pub fn on_tile_type_changed(
        &mut self,
        grid: &mut Grid,
        coord: TileCoord,
        events: &mut EventBus,
    ) {
        match grid.tile_type(coord) {
            TileType::Empty => {
                let room = grid.tile(coord).and_then(|t| t.room);
                self.unassign(grid, coord);
                if let Some(room) = room.filter(|r| !r.is_outside()) {
                    log::debug!("{} breached at {}", room, coord);
                    self.merge(grid, RoomId::OUTSIDE, room, events);
                }
            }
            TileType::Floor => {
                if grid.tile(coord).map(|t| t.room.is_none()).unwrap_or(false) {
                    self.assign(grid, coord, RoomId::OUTSIDE);
                }
            }
        }
    }

    /// Renumbers the current partition to match saved ids and restores each
    /// room's gases. Rooms are matched by the saved id of any member tile.
    pub fn restore(
        &mut self,
        grid: &mut Grid,
        saved_ids: &BTreeMap<TileCoord, RoomId>,
        saved_gases: &BTreeMap<RoomId, BTreeMap<String, f32>>,
    ) {
        let mut mapping: BTreeMap<RoomId, RoomId> = BTreeMap::new();
        let mut taken: BTreeSet<RoomId> = BTreeSet::from([RoomId::OUTSIDE]);
        for room in self.enclosed() {
            let wanted = room.tiles().find_map(|c| saved_ids.get(c)).copied();
            if let Some(wanted) = wanted.filter(|w| !w.is_outside() && !taken.contains(w)) {
                mapping.insert(room.id, wanted);
                taken.insert(wanted);
            }
        }
        let mut next = taken.iter().map(|r| r.0).max().unwrap_or(0).max(self.next_id - 1) + 1;

        let old_rooms = std::mem::take(&mut self.rooms);
        for (id, mut room) in old_rooms {
            let new_id = if id.is_outside() {
                id
            } else if let Some(mapped) = mapping.get(&id) {
                *mapped
            } else {
                let fresh = RoomId(next);
                next += 1;
                fresh
            };
            room.id = new_id;
            for coord in room.tiles() {
                if let Some(tile) = grid.tile_mut(*coord) {
                    tile.room = Some(new_id);
                }
            }
            if let Some(gases) = saved_gases.get(&new_id) {
                for (name, amount) in gases {
                    room.set_gas(name, *amount);
                }
            }
            self.rooms.insert(new_id, room);
        }
        self.next_id = next;
    }
}
