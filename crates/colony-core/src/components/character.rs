//! Colonist state.

use serde::{Deserialize, Serialize};

use super::{lerp, JobId, StackId, TileCoord};
use crate::systems::TilePath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    #[default]
    Idle,
    /// Holding a job, heading for its tile.
    Seeking,
    /// Walking to a supply stack.
    Fetching,
    /// Carrying materials to the job tile.
    Delivering,
    Working,
}

#[derive(Debug, Clone)]
pub struct Character {
    pub current: TileCoord,
    pub next: TileCoord,
    pub destination: TileCoord,
    /// Whether the destination itself must be reached, or only a tile beside it.
    pub end_on_tile: bool,
    /// Fraction of the edge from `current` to `next` covered, 0..1.
    pub progress: f32,
    /// Tiles per second on a cost-1 tile.
    pub speed: f32,
    pub state: CharacterState,
    pub job: Option<JobId>,
    pub path: Option<TilePath>,
    pub carrying: Option<StackId>,
    /// Jobs this character ignores until the timer runs out.
    pub cooldowns: Vec<(JobId, f32)>,
}

impl Character {
    pub fn new(tile: TileCoord, speed: f32) -> Self {
        Self {
            current: tile,
            next: tile,
            destination: tile,
            end_on_tile: true,
            progress: 0.0,
            speed,
            state: CharacterState::Idle,
            job: None,
            path: None,
            carrying: None,
            cooldowns: Vec::new(),
        }
    }

    /// World position, interpolated between tile centres.
    pub fn position(&self) -> (f32, f32) {
        (
            lerp(self.current.x as f32, self.next.x as f32, self.progress),
            lerp(self.current.y as f32, self.next.y as f32, self.progress),
        )
    }

    pub fn set_destination(&mut self, tile: TileCoord, end_on_tile: bool) {
        if self.destination != tile || self.end_on_tile != end_on_tile {
            self.destination = tile;
            self.end_on_tile = end_on_tile;
            self.path = None;
        }
    }

    /// Drops any travel plan and stays on the current tile.
    pub fn halt(&mut self) {
        self.next = self.current;
        self.destination = self.current;
        self.end_on_tile = true;
        self.progress = 0.0;
        self.path = None;
    }

    pub fn is_cooling_down(&self, job: JobId) -> bool {
        self.cooldowns.iter().any(|(id, _)| *id == job)
    }

    pub fn tick_cooldowns(&mut self, dt: f32) {
        for (_, remaining) in &mut self.cooldowns {
            *remaining -= dt;
        }
        self.cooldowns.retain(|(_, remaining)| *remaining > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_position_interpolates() {
        let mut ch = Character::new(TileCoord::new(0, 0), 5.0);
        ch.next = TileCoord::new(1, 1);
        ch.progress = 0.5;
        assert_eq!(ch.position(), (0.5, 0.5));
    }

    #[test]
    fn test_cooldowns_expire() {
        let mut ids: SlotMap<JobId, ()> = SlotMap::with_key();
        let job = ids.insert(());

        let mut ch = Character::new(TileCoord::new(0, 0), 5.0);
        ch.cooldowns.push((job, 1.0));
        assert!(ch.is_cooling_down(job));

        ch.tick_cooldowns(0.6);
        assert!(ch.is_cooling_down(job));
        ch.tick_cooldowns(0.6);
        assert!(!ch.is_cooling_down(job));
    }
}
