//! Units of work bound to a tile.

use std::collections::BTreeMap;

use hecs::Entity;

use super::{footprint, Inventory, TileCoord};

/// What finishing the job does to the world.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPurpose {
    /// Install a furniture of this kind on the job tile.
    Build { furniture: String },
    /// Remove the furniture on the job tile.
    Deconstruct,
    /// Fill the stockpile at the job tile; deposits on every worked step.
    Haul { stockpile: Entity },
    Generic,
}

/// Result of applying work time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    /// Materials missing; no time consumed.
    Waiting,
    Progress,
    Completed { repeats: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub tile: TileCoord,
    /// Width and height of the area the job claims, anchored at `tile`.
    pub size: (u32, u32),
    /// Object type being built or acted on.
    pub kind: Option<String>,
    pub purpose: JobPurpose,
    pub work_remaining: f32,
    pub work_required: f32,
    /// The worker must occupy the tile rather than stand beside it.
    pub stand_on_tile: bool,
    pub can_take_from_stockpile: bool,
    pub repeats: bool,
    /// Required materials keyed by item kind.
    pub requirements: BTreeMap<String, Inventory>,
    /// Character holding the job. Queued jobs have none.
    pub worker: Option<Entity>,
}

impl Job {
    pub fn new(tile: TileCoord, purpose: JobPurpose, work_time: f32) -> Self {
        let kind = match &purpose {
            JobPurpose::Build { furniture } => Some(furniture.clone()),
            _ => None,
        };
        Self {
            tile,
            size: (1, 1),
            kind,
            purpose,
            work_remaining: work_time,
            work_required: work_time,
            stand_on_tile: true,
            can_take_from_stockpile: true,
            repeats: false,
            requirements: BTreeMap::new(),
            worker: None,
        }
    }

    /// A build order needing `materials` (item kind to amount).
    pub fn build(
        tile: TileCoord,
        furniture: &str,
        work_time: f32,
        materials: &BTreeMap<String, u32>,
    ) -> Self {
        let mut job = Self::new(
            tile,
            JobPurpose::Build {
                furniture: furniture.to_string(),
            },
            work_time,
        );
        for (kind, amount) in materials {
            job = job.with_requirement(kind, *amount);
        }
        job
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_requirement(mut self, kind: &str, amount: u32) -> Self {
        if amount > 0 {
            self.requirements
                .insert(kind.to_string(), Inventory::new(kind, amount, 0));
        }
        self
    }

    pub fn covering(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Tiles whose pending-job marker points at this job.
    pub fn claimed_tiles(&self) -> impl Iterator<Item = TileCoord> {
        footprint(self.tile, self.size.0, self.size.1)
    }

    pub fn stand_beside(mut self) -> Self {
        self.stand_on_tile = false;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeats = true;
        self
    }

    pub fn from_stockpile(mut self, allowed: bool) -> Self {
        self.can_take_from_stockpile = allowed;
        self
    }

    /// Negative required time means the job completes the moment it is
    /// submitted.
    pub fn is_instant(&self) -> bool {
        self.work_required < 0.0
    }

    pub fn requirements_met(&self) -> bool {
        self.requirements.values().all(Inventory::is_full)
    }

    /// Amount of `kind` still needed.
    pub fn missing(&self, kind: &str) -> u32 {
        self.requirements
            .get(kind)
            .map(Inventory::space_left)
            .unwrap_or(0)
    }

    pub fn needs(&self, kind: &str) -> bool {
        self.missing(kind) > 0
    }

    /// Unfilled requirements in kind order.
    pub fn unmet(&self) -> impl Iterator<Item = &Inventory> {
        self.requirements.values().filter(|req| !req.is_full())
    }

    /// Applies `dt` seconds of work. Never completes while materials are
    /// missing.
    pub fn do_work(&mut self, dt: f32) -> JobStep {
        if !self.requirements_met() {
            return JobStep::Waiting;
        }
        self.work_remaining -= dt;
        if self.work_remaining > 0.0 {
            return JobStep::Progress;
        }
        if self.repeats {
            self.work_remaining = self.work_required;
        }
        JobStep::Completed {
            repeats: self.repeats,
        }
    }
}
