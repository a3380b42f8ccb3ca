//! Simulation systems.
//!
//! Systems hold the behaviour that drives components: room partitioning,
//! the job queue, stack transfers, path search, per-tick furniture hooks and
//! the character state machine.

mod characters;
mod furniture;
mod inventory;
mod jobs;
mod pathfinding;
mod rooms;

pub(crate) use characters::*;
pub(crate) use furniture::*;
pub use furniture::{poll_door, update_door};
pub use inventory::*;
pub use jobs::*;
pub use pathfinding::*;
pub use rooms::*;

use crate::components::JobId;

/// Job side effects raised during an actor's turn and settled by the engine
/// once that actor is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobSignal {
    Worked(JobId),
    Completed(JobId),
    Cancel(JobId),
}
