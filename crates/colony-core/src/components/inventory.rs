//! Item stacks.

use hecs::Entity;

use super::TileCoord;

/// Who holds a stack. A stack has at most one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOwner {
    Tile(TileCoord),
    Character(Entity),
}

/// A quantity of one item kind. Also used unowned as a job's material
/// requirement, where `stack_size` counts what has been delivered so far and
/// `max_stack_size` what is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub kind: String,
    pub stack_size: u32,
    pub max_stack_size: u32,
    pub owner: Option<StackOwner>,
}

impl Inventory {
    pub fn new(kind: impl Into<String>, max_stack_size: u32, stack_size: u32) -> Self {
        Self {
            kind: kind.into(),
            stack_size,
            max_stack_size,
            owner: None,
        }
    }

    pub fn space_left(&self) -> u32 {
        self.max_stack_size.saturating_sub(self.stack_size)
    }

    pub fn is_full(&self) -> bool {
        self.stack_size >= self.max_stack_size
    }

    pub fn is_empty(&self) -> bool {
        self.stack_size == 0
    }

    pub fn tile(&self) -> Option<TileCoord> {
        match self.owner {
            Some(StackOwner::Tile(coord)) => Some(coord),
            _ => None,
        }
    }
}
