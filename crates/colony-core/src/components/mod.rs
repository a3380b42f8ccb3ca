//! Component definitions for the colony simulation.
//!
//! Components are pure data: tiles, furniture, stacks, jobs, characters and
//! rooms. Behaviour lives in `systems`, orchestration in the engine.

mod character;
mod common;
mod furniture;
mod inventory;
mod job;
mod room;
mod tile;

pub use character::*;
pub use common::*;
pub use furniture::*;
pub use inventory::*;
pub use job::*;
pub use room::*;
pub use tile::*;

slotmap::new_key_type! {
    /// Handle to a job owned by the job queue.
    pub struct JobId;
    /// Handle to a live inventory stack.
    pub struct StackId;
}
