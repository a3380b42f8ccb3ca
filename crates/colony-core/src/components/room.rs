//! Rooms: enclosed partitions of the grid with their own atmosphere.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::TileCoord;

/// Identifier of a room. Ids are never reused within a run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RoomId(pub u32);

impl RoomId {
    /// The unenclosed region. Never deleted.
    pub const OUTSIDE: RoomId = RoomId(0);

    pub fn is_outside(self) -> bool {
        self == Self::OUTSIDE
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_outside() {
            write!(f, "outside")
        } else {
            write!(f, "room#{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub(crate) tiles: BTreeSet<TileCoord>,
    gases: BTreeMap<String, f32>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            tiles: BTreeSet::new(),
            gases: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.tiles.contains(coord)
    }

    /// Amount of a gas, 0 when the room has never held it.
    pub fn gas(&self, name: &str) -> f32 {
        self.gases.get(name).copied().unwrap_or(0.0)
    }

    /// Adds (or removes, when negative) gas. Outside is vacuum and ignores it.
    pub fn change_gas(&mut self, name: &str, amount: f32) {
        if self.id.is_outside() {
            return;
        }
        let entry = self.gases.entry(name.to_string()).or_insert(0.0);
        *entry = (*entry + amount).max(0.0);
    }

    pub fn set_gas(&mut self, name: &str, amount: f32) {
        if self.id.is_outside() {
            return;
        }
        self.gases.insert(name.to_string(), amount.max(0.0));
    }

    pub fn gas_names(&self) -> impl Iterator<Item = &str> {
        self.gases.keys().map(String::as_str)
    }

    pub fn gases(&self) -> &BTreeMap<String, f32> {
        &self.gases
    }

    /// Seed this room's atmosphere from the room it was split off.
    pub fn copy_gases_from(&mut self, other: &Room) {
        if self.id.is_outside() {
            return;
        }
        self.gases = other.gases.clone();
    }

    /// Tile-count-weighted average of both atmospheres. Must be called
    /// before any tiles move between the two rooms.
    pub fn merge_from(&mut self, other: &Room) {
        if self.id.is_outside() {
            return;
        }
        let mine = self.size() as f32;
        let theirs = other.size() as f32;
        let total = mine + theirs;
        if total == 0.0 {
            return;
        }

        let names: BTreeSet<String> = self
            .gases
            .keys()
            .chain(other.gases.keys())
            .cloned()
            .collect();
        for name in names {
            let merged = (self.gas(&name) * mine + other.gas(&name) * theirs) / total;
            self.gases.insert(name, merged);
        }
    }
}
