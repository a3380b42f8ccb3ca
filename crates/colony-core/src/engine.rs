//! Simulation engine - composition root and tick driver.
//!
//! Owns the grid, rooms, job queue, stacks, path cache and the ECS world of
//! furniture and characters. Presentation layers issue commands here and
//! subscribe to [`SimEvent`]s.

use hecs::{Entity, World};

use crate::catalog::{FurnitureCatalog, FurniturePrototype};
use crate::components::*;
use crate::config::{validate_config, SimConfig};
use crate::error::{ConfigError, SaveError, WorldError};
use crate::events::{EventBus, EventKind, SimEvent, SubscriptionId};
use crate::grid::Grid;
use crate::systems::*;

pub struct SimulationEngine {
    /// ECS world holding furniture and character entities
    pub world: World,
    /// Seconds simulated since start
    pub sim_time: f64,
    grid: Grid,
    rooms: RoomSet,
    jobs: JobQueue,
    inventory: InventoryManager,
    paths: PathCache,
    catalog: FurnitureCatalog,
    config: SimConfig,
    events: EventBus,
    // Tick order
    furniture: Vec<Entity>,
    characters: Vec<Entity>,
}

fn out_of_bounds(coord: TileCoord) -> WorldError {
    WorldError::OutOfBounds {
        x: coord.x,
        y: coord.y,
    }
}

impl SimulationEngine {
    /// A world of Empty tiles.
    pub fn new(config: SimConfig, catalog: FurnitureCatalog) -> Self {
        let grid = Grid::new(config.width, config.height);
        log::info!(
            "World created: {}x{} tiles, {} furniture prototypes",
            config.width,
            config.height,
            catalog.kinds().count()
        );
        Self {
            world: World::new(),
            sim_time: 0.0,
            grid,
            rooms: RoomSet::new(),
            jobs: JobQueue::new(),
            inventory: InventoryManager::new(),
            paths: PathCache::new(config.path_cache_capacity),
            catalog,
            config,
            events: EventBus::new(),
            furniture: Vec::new(),
            characters: Vec::new(),
        }
    }

    /// Validates `config` and uses the embedded prototype catalog.
    pub fn with_builtin_catalog(config: SimConfig) -> Result<Self, ConfigError> {
        if let Some(err) = validate_config(&config).into_iter().next() {
            return Err(err);
        }
        Ok(Self::new(config, FurnitureCatalog::builtin()?))
    }

    // --- Queries ---

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.grid.tile(coord)
    }

    pub fn movement_cost(&self, coord: TileCoord) -> f32 {
        self.grid.movement_cost(coord)
    }

    pub fn furniture_at(&self, coord: TileCoord) -> Option<hecs::Ref<'_, Furniture>> {
        let installed = self.grid.tile(coord)?.furniture?;
        self.world.get::<&Furniture>(installed.entity).ok()
    }

    /// Furniture entities in placement order.
    pub fn furniture_entities(&self) -> &[Entity] {
        &self.furniture
    }

    pub fn inventory_at(&self, coord: TileCoord) -> Option<&Inventory> {
        let id = self.grid.tile(coord)?.inventory?;
        self.inventory.stack(id)
    }

    pub fn inventory(&self) -> &InventoryManager {
        &self.inventory
    }

    pub fn room_of(&self, coord: TileCoord) -> Option<&Room> {
        let id = self.grid.tile(coord)?.room?;
        self.rooms.get(id)
    }

    pub fn room_of_mut(&mut self, coord: TileCoord) -> Option<&mut Room> {
        let id = self.grid.tile(coord)?.room?;
        self.rooms.get_mut(id)
    }

    pub fn rooms(&self) -> &RoomSet {
        &self.rooms
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    pub fn character(&self, entity: Entity) -> Option<hecs::Ref<'_, Character>> {
        self.world.get::<&Character>(entity).ok()
    }

    /// Character entities in spawn order.
    pub fn characters(&self) -> &[Entity] {
        &self.characters
    }

    pub fn catalog(&self) -> &FurnitureCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.paths
    }

    /// Polls the tile as a character about to step on it would. Doors start
    /// opening.
    pub fn enterability(&mut self, coord: TileCoord) -> Enterability {
        enterability(&self.grid, &self.world, coord)
    }

    pub fn is_placement_valid(&self, kind: &str, anchor: TileCoord) -> bool {
        self.catalog
            .get(kind)
            .map(|proto| self.check_placement(proto, anchor).is_ok())
            .unwrap_or(false)
    }

    fn check_placement(&self, proto: &FurniturePrototype, anchor: TileCoord) -> Result<(), WorldError> {
        let invalid = || WorldError::InvalidPlacement {
            kind: proto.kind.clone(),
            x: anchor.x,
            y: anchor.y,
        };
        let impassable = proto.movement_cost <= 0.0;
        for coord in footprint(anchor, proto.width, proto.height) {
            let tile = self.grid.tile(coord).ok_or_else(invalid)?;
            if tile.tile_type != TileType::Floor || tile.furniture.is_some() {
                return Err(invalid());
            }
            // Items under a wall could never be picked up again.
            if impassable && tile.inventory.is_some() {
                return Err(invalid());
            }
        }
        Ok(())
    }

    // --- Events ---

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&SimEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --- Commands ---

    pub fn set_tile_type(&mut self, coord: TileCoord, tile_type: TileType) -> Result<(), WorldError> {
        let tile = self.grid.tile(coord).ok_or_else(|| out_of_bounds(coord))?;
        if tile.tile_type == tile_type {
            return Ok(());
        }
        if tile_type == TileType::Empty && (tile.furniture.is_some() || tile.inventory.is_some()) {
            return Err(WorldError::TileOccupied {
                x: coord.x,
                y: coord.y,
            });
        }

        if let Some(tile) = self.grid.tile_mut(coord) {
            tile.tile_type = tile_type;
        }
        self.events.emit(SimEvent::TileChanged(coord));
        self.paths.invalidate();
        self.rooms
            .on_tile_type_changed(&mut self.grid, coord, &mut self.events);
        Ok(())
    }

    /// Installs a furniture right away, bypassing the job queue.
    pub fn place_furniture(&mut self, kind: &str, anchor: TileCoord) -> Result<Entity, WorldError> {
        let proto = self
            .catalog
            .get(kind)
            .ok_or_else(|| WorldError::UnknownPrototype(kind.to_string()))?;
        self.check_placement(proto, anchor)?;

        let furn = proto.instantiate(anchor);
        let tiles: Vec<TileCoord> = furn.footprint().collect();
        let (movement_cost, room_border, links) =
            (furn.movement_cost, furn.room_border, furn.links_to_neighbour);
        let entity = self.world.spawn((furn,));

        for coord in &tiles {
            if let Some(tile) = self.grid.tile_mut(*coord) {
                tile.furniture = Some(Installed {
                    entity,
                    movement_cost,
                    room_border,
                });
            }
        }
        self.furniture.push(entity);
        self.events.emit(SimEvent::FurnitureCreated {
            entity,
            kind: kind.to_string(),
            anchor,
        });
        if links {
            for neighbour in self.linked_neighbours(entity, kind, anchor) {
                self.events.emit(SimEvent::FurnitureChanged(neighbour));
            }
        }

        self.paths.invalidate();
        if room_border {
            for coord in tiles {
                self.rooms
                    .on_border_placed(&mut self.grid, coord, &mut self.events);
            }
        }
        log::debug!("Placed {} at {}", kind, anchor);
        Ok(entity)
    }

    /// Same-kind furniture orthogonally next to `anchor`.
    fn linked_neighbours(&self, entity: Entity, kind: &str, anchor: TileCoord) -> Vec<Entity> {
        let mut found = Vec::new();
        for coord in self.grid.neighbours(anchor, false).into_iter().flatten() {
            let Some(other) = self.grid.tile(coord).and_then(|t| t.furniture) else {
                continue;
            };
            if other.entity == entity || found.contains(&other.entity) {
                continue;
            }
            let same_kind = self
                .world
                .get::<&Furniture>(other.entity)
                .map(|f| f.kind == kind)
                .unwrap_or(false);
            if same_kind {
                found.push(other.entity);
            }
        }
        found
    }

    /// Removes the furniture covering `coord` right away.
    pub fn remove_furniture(&mut self, coord: TileCoord) -> Result<(), WorldError> {
        let no_furniture = || WorldError::NoFurniture {
            x: coord.x,
            y: coord.y,
        };
        let entity = self
            .grid
            .tile(coord)
            .and_then(|t| t.furniture)
            .map(|f| f.entity)
            .ok_or_else(no_furniture)?;
        let furn = self
            .world
            .get::<&Furniture>(entity)
            .map(|f| (*f).clone())
            .map_err(|_| no_furniture())?;
        let linked = if furn.links_to_neighbour {
            self.linked_neighbours(entity, &furn.kind, furn.anchor)
        } else {
            Vec::new()
        };

        if self.world.despawn(entity).is_err() {
            log::error!("Furniture {:?} vanished from the world", entity);
        }
        self.furniture.retain(|e| *e != entity);
        for tile in furn.footprint() {
            if let Some(tile) = self.grid.tile_mut(tile) {
                if tile.furniture.map(|f| f.entity) == Some(entity) {
                    tile.furniture = None;
                }
            }
        }
        if let Behavior::Stockpile(pile) = &furn.behavior {
            if let Some(job) = pile.demand_job {
                self.cancel_job(job);
            }
        }

        self.events.emit(SimEvent::FurnitureRemoved {
            entity,
            kind: furn.kind.clone(),
            anchor: furn.anchor,
        });
        for neighbour in linked {
            self.events.emit(SimEvent::FurnitureChanged(neighbour));
        }

        self.paths.invalidate();
        if furn.room_border {
            for tile in furn.footprint() {
                self.rooms
                    .on_border_removed(&mut self.grid, tile, &mut self.events);
            }
        }
        log::debug!("Removed {} at {}", furn.kind, furn.anchor);
        Ok(())
    }

    /// Queues a build job for `kind` at `anchor`.
    pub fn order_build(&mut self, kind: &str, anchor: TileCoord) -> Result<JobId, WorldError> {
        let proto = self
            .catalog
            .get(kind)
            .ok_or_else(|| WorldError::UnknownPrototype(kind.to_string()))?;
        self.check_placement(proto, anchor)?;

        let job = Job::build(anchor, kind, proto.build_time, &proto.materials)
            .covering(proto.width, proto.height);
        self.claim(job)
    }

    /// Queues removal of the furniture covering `coord`. The worker stands
    /// beside it.
    pub fn order_deconstruct(&mut self, coord: TileCoord) -> Result<JobId, WorldError> {
        let tile = self.grid.tile(coord).ok_or_else(|| out_of_bounds(coord))?;
        let installed = tile.furniture.ok_or(WorldError::NoFurniture {
            x: coord.x,
            y: coord.y,
        })?;
        let (kind, anchor, width, height) = self
            .world
            .get::<&Furniture>(installed.entity)
            .map(|f| (f.kind.clone(), f.anchor, f.width, f.height))
            .map_err(|_| WorldError::NoFurniture {
                x: coord.x,
                y: coord.y,
            })?;

        let job = Job::new(anchor, JobPurpose::Deconstruct, self.config.deconstruct_time)
            .with_kind(kind)
            .covering(width, height)
            .stand_beside();
        self.claim(job)
    }

    /// Queues a job that marks its footprint, unless any of those tiles is
    /// already spoken for.
    fn claim(&mut self, job: Job) -> Result<JobId, WorldError> {
        if let Some(taken) = claim_conflict(&self.grid, &job) {
            return Err(WorldError::PendingJob {
                x: taken.x,
                y: taken.y,
            });
        }
        let claimed = job.clone();
        let id = self.jobs.add(job);
        claim_tiles(&mut self.grid, id, &claimed);
        self.dispatch(id);
        Ok(id)
    }

    /// Queues an arbitrary job.
    pub fn submit_job(&mut self, job: Job) -> JobId {
        let id = self.jobs.add(job);
        self.dispatch(id);
        id
    }

    /// Instant jobs with their materials in hand complete on the spot;
    /// everything else joins the queue.
    fn dispatch(&mut self, id: JobId) {
        let instant = self
            .jobs
            .get(id)
            .map(|j| j.is_instant() && j.requirements_met())
            .unwrap_or(false);
        if instant {
            self.events.emit(SimEvent::JobWorked(id));
            self.on_job_completed(id);
        } else {
            self.jobs.enqueue(id, Announce::New, &mut self.events);
        }
    }

    /// Cancels a job wherever it is. Fires `JobStopped`.
    pub fn cancel_job(&mut self, id: JobId) -> bool {
        self.finish_job(id).is_some()
    }

    /// Ends a job: drops it, clears the tile back-reference and frees the
    /// worker.
    fn finish_job(&mut self, id: JobId) -> Option<Job> {
        let job = self.jobs.cancel(id, &mut self.events)?;
        release_tiles(&mut self.grid, id, &job);
        if let Some(worker) = job.worker {
            if let Ok(mut ch) = self.world.get::<&mut Character>(worker) {
                if ch.job == Some(id) {
                    ch.job = None;
                    ch.state = CharacterState::Idle;
                    ch.halt();
                }
            }
        }
        Some(job)
    }

    pub fn spawn_character(&mut self, coord: TileCoord) -> Result<Entity, WorldError> {
        let tile = self.grid.tile(coord).ok_or_else(|| out_of_bounds(coord))?;
        if !tile.is_walkable() {
            return Err(WorldError::NotWalkable {
                x: coord.x,
                y: coord.y,
            });
        }
        let entity = self
            .world
            .spawn((Character::new(coord, self.config.character_speed),));
        self.characters.push(entity);
        self.events.emit(SimEvent::CharacterCreated(entity));
        Ok(entity)
    }

    /// Drops `amount` of `kind` on a tile, capped at the item's stack limit.
    pub fn spawn_inventory(
        &mut self,
        coord: TileCoord,
        kind: &str,
        amount: u32,
    ) -> Result<StackId, WorldError> {
        if !self.grid.in_bounds(coord) {
            return Err(out_of_bounds(coord));
        }
        let max = self.catalog.item_max_stack(kind);
        let mut load = Inventory::new(kind, max, amount.min(max));
        Ok(self
            .inventory
            .spawn_on_tile(&mut self.grid, coord, &mut load, &mut self.events)?)
    }

    pub(crate) fn restore_stack(
        &mut self,
        coord: TileCoord,
        mut stack: Inventory,
    ) -> Result<StackId, WorldError> {
        Ok(self
            .inventory
            .spawn_on_tile(&mut self.grid, coord, &mut stack, &mut self.events)?)
    }

    pub(crate) fn restore_rooms(
        &mut self,
        saved_ids: &std::collections::BTreeMap<TileCoord, RoomId>,
        saved_gases: &std::collections::BTreeMap<RoomId, std::collections::BTreeMap<String, f32>>,
    ) {
        self.rooms.restore(&mut self.grid, saved_ids, saved_gases);
    }

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        crate::persistence::save_simulation(writer, self)
    }

    /// Replace this world with a saved one. Config and catalog are kept,
    /// as are event subscriptions.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let data = crate::persistence::load_simulation(reader)?;
        let mut loaded = data.rebuild(self.config.clone(), self.catalog.clone())?;
        loaded.events = std::mem::take(&mut self.events);
        *self = loaded;
        log::info!("Loaded save at t={:.1}s", self.sim_time);
        Ok(())
    }

    // --- Tick ---

    /// Advances the simulation by `dt` seconds: every character, then every
    /// furniture.
    pub fn tick(&mut self, dt: f32) {
        self.sim_time += dt as f64;

        let characters = self.characters.clone();
        for entity in characters {
            let mut signals = Vec::new();
            let changed = {
                let Ok(mut ch) = self.world.get::<&mut Character>(entity) else {
                    continue;
                };
                let mut ctx = CharacterContext {
                    grid: &mut self.grid,
                    jobs: &mut self.jobs,
                    inventory: &mut self.inventory,
                    paths: &mut self.paths,
                    entities: &self.world,
                    config: &self.config,
                    events: &mut self.events,
                    signals: &mut signals,
                };
                tick_character(entity, &mut ch, &mut ctx, dt)
            };
            if changed {
                self.events.emit(SimEvent::CharacterChanged(entity));
            }
            self.settle(signals);
        }

        let furniture = self.furniture.clone();
        for entity in furniture {
            let mut signals = Vec::new();
            {
                let Ok(mut furn) = self.world.get::<&mut Furniture>(entity) else {
                    continue;
                };
                let mut ctx = FurnitureContext {
                    grid: &self.grid,
                    rooms: &mut self.rooms,
                    jobs: &mut self.jobs,
                    inventory: &self.inventory,
                    config: &self.config,
                    events: &mut self.events,
                    signals: &mut signals,
                };
                tick_furniture(entity, &mut furn, &mut ctx, dt);
            }
            self.settle(signals);
        }
    }

    fn settle(&mut self, signals: Vec<JobSignal>) {
        for signal in signals {
            match signal {
                JobSignal::Worked(id) => self.on_job_worked(id),
                JobSignal::Completed(id) => self.on_job_completed(id),
                JobSignal::Cancel(id) => {
                    self.cancel_job(id);
                }
            }
        }
    }

    /// Hauling jobs unload into their stockpile on every worked step.
    fn on_job_worked(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        let JobPurpose::Haul { stockpile } = job.purpose else {
            return;
        };
        let tile = job.tile;
        let complete = job.requirements_met();
        let delivered: Vec<(String, u32)> = job
            .requirements
            .values()
            .filter(|r| r.stack_size > 0)
            .map(|r| (r.kind.clone(), r.stack_size))
            .collect();
        if delivered.is_empty() {
            return;
        }

        for (kind, amount) in delivered {
            let max = self.catalog.item_max_stack(&kind);
            let mut load = Inventory::new(kind, max, amount);
            if let Err(e) =
                self.inventory
                    .spawn_on_tile(&mut self.grid, tile, &mut load, &mut self.events)
            {
                log::debug!("Stockpile at {} rejected delivery: {}", tile, e);
            }
            if load.stack_size > 0 {
                self.spill_near(tile, &mut load);
            }
        }

        if let Ok(mut furn) = self.world.get::<&mut Furniture>(stockpile) {
            if let Behavior::Stockpile(pile) = &mut furn.behavior {
                if pile.demand_job == Some(id) {
                    pile.demand_job = None;
                }
            }
        }
        if complete {
            self.events.emit(SimEvent::JobCompleted(id));
        }
        self.finish_job(id);
    }

    /// Puts what a stockpile would not take on the nearest free floor
    /// around it.
    fn spill_near(&mut self, origin: TileCoord, load: &mut Inventory) {
        let spots: Vec<TileCoord> = self
            .grid
            .neighbours(origin, true)
            .into_iter()
            .flatten()
            .collect();
        for spot in spots {
            if load.stack_size == 0 {
                return;
            }
            let usable = self
                .grid
                .tile(spot)
                .map(|t| t.is_walkable() && t.pending_furniture_job.is_none())
                .unwrap_or(false);
            if !usable {
                continue;
            }
            if let Err(e) =
                self.inventory
                    .spawn_on_tile(&mut self.grid, spot, load, &mut self.events)
            {
                log::debug!("Spill of {} onto {} refused: {}", load.kind, spot, e);
            }
        }
        if load.stack_size > 0 {
            log::warn!(
                "No room near {} for {} {}",
                origin,
                load.stack_size,
                load.kind
            );
        }
    }

    fn on_job_completed(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        self.events.emit(SimEvent::JobCompleted(id));
        if job.repeats {
            return;
        }
        let (purpose, tile) = (job.purpose.clone(), job.tile);
        log::debug!("Job {:?} at {} completed", id, tile);

        match purpose {
            JobPurpose::Build { furniture } => {
                if let Err(e) = self.place_furniture(&furniture, tile) {
                    log::warn!("Finished {} job could not be installed: {}", furniture, e);
                }
            }
            JobPurpose::Deconstruct => {
                if let Err(e) = self.remove_furniture(tile) {
                    log::warn!("Deconstruct at {} found nothing: {}", tile, e);
                }
            }
            JobPurpose::Haul { .. } | JobPurpose::Generic => {}
        }
        self.finish_job(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(width: u32, height: u32) -> SimulationEngine {
        let mut engine =
            SimulationEngine::with_builtin_catalog(SimConfig::with_size(width, height)).unwrap();
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                engine.set_tile_type(TileCoord::new(x, y), TileType::Floor).unwrap();
            }
        }
        engine
    }

    fn run(engine: &mut SimulationEngine, seconds: f32) {
        let steps = (seconds / 0.05).ceil() as usize;
        for _ in 0..steps {
            engine.tick(0.05);
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::with_builtin_catalog(SimConfig::with_size(8, 6)).unwrap();
        assert_eq!(engine.grid().width(), 8);
        assert_eq!(engine.sim_time, 0.0);
        assert!(engine.tile(TileCoord::new(3, 3)).unwrap().is_empty());
        assert_eq!(engine.rooms().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SimulationEngine::with_builtin_catalog(SimConfig::with_size(0, 5));
        assert!(matches!(result, Err(ConfigError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_movement_cost_property() {
        let mut engine = engine(4, 4);
        engine.set_tile_type(TileCoord::new(3, 3), TileType::Empty).unwrap();
        engine.place_furniture("Wall", TileCoord::new(1, 1)).unwrap();
        engine.place_furniture("Door", TileCoord::new(2, 2)).unwrap();

        for tile in engine.grid().tiles() {
            let zero_cost_furniture = engine
                .furniture_at(tile.coord)
                .map(|f| f.movement_cost == 0.0)
                .unwrap_or(false);
            let expect_zero = tile.is_empty() || zero_cost_furniture;
            assert_eq!(engine.movement_cost(tile.coord) == 0.0, expect_zero);
        }
    }

    #[test]
    fn test_invalid_placement_rejected() {
        let mut engine = engine(4, 4);
        engine.set_tile_type(TileCoord::new(0, 0), TileType::Empty).unwrap();
        assert!(matches!(
            engine.place_furniture("Wall", TileCoord::new(0, 0)),
            Err(WorldError::InvalidPlacement { .. })
        ));

        engine.place_furniture("Wall", TileCoord::new(1, 1)).unwrap();
        assert!(engine.place_furniture("Wall", TileCoord::new(1, 1)).is_err());
        assert!(!engine.is_placement_valid("Oxygen Generator", TileCoord::new(3, 3)));
        assert_eq!(
            engine.place_furniture("Throne", TileCoord::new(2, 2)),
            Err(WorldError::UnknownPrototype("Throne".into()))
        );
        assert_eq!(engine.furniture_entities().len(), 1);
    }

    #[test]
    fn test_empty_tile_with_furniture_rejected() {
        let mut engine = engine(3, 3);
        engine.place_furniture("Wall", TileCoord::new(1, 1)).unwrap();
        assert_eq!(
            engine.set_tile_type(TileCoord::new(1, 1), TileType::Empty),
            Err(WorldError::TileOccupied { x: 1, y: 1 })
        );
    }

    #[test]
    fn test_multi_tile_footprint() {
        let mut engine = engine(5, 5);
        let e = engine.place_furniture("Oxygen Generator", TileCoord::new(1, 1)).unwrap();
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            let tile = engine.tile(TileCoord::new(x, y)).unwrap();
            assert_eq!(tile.furniture.map(|f| f.entity), Some(e));
        }
        engine.remove_furniture(TileCoord::new(2, 2)).unwrap();
        assert!(engine.tile(TileCoord::new(1, 1)).unwrap().furniture.is_none());
    }

    #[test]
    fn test_duplicate_build_order_rejected() {
        let mut engine = engine(4, 4);
        let c = TileCoord::new(2, 2);
        let id = engine.order_build("Wall", c).unwrap();
        assert_eq!(engine.tile(c).unwrap().pending_furniture_job, Some(id));
        assert_eq!(engine.order_build("Door", c), Err(WorldError::PendingJob { x: 2, y: 2 }));
        assert_eq!(engine.jobs().len(), 1);
    }

    #[test]
    fn test_instant_build() {
        let mut engine = engine(4, 4);
        let c = TileCoord::new(1, 1);
        engine.order_build("Stockpile", c).unwrap();
        assert!(engine.furniture_at(c).map(|f| f.is_stockpile()).unwrap_or(false));
        assert_eq!(engine.tile(c).unwrap().pending_furniture_job, None);
        assert_eq!(engine.jobs().live_jobs(), 0);
    }

    #[test]
    fn test_path_graph_rebuilt_lazily() {
        let mut engine = engine(6, 6);
        let who = engine.spawn_character(TileCoord::new(0, 0)).unwrap();
        let job = Job::new(TileCoord::new(5, 5), JobPurpose::Generic, 0.1);
        engine.submit_job(job);
        engine.tick(0.05);
        assert_eq!(engine.path_cache().rebuild_count(), 1);

        engine.place_furniture("Wall", TileCoord::new(3, 0)).unwrap();
        engine.place_furniture("Wall", TileCoord::new(3, 1)).unwrap();
        assert!(!engine.path_cache().is_valid());
        assert_eq!(engine.path_cache().rebuild_count(), 1);

        run(&mut engine, 3.0);
        assert!(engine.character(who).unwrap().job.is_none());
        assert!(engine.path_cache().rebuild_count() <= 2);
    }

    #[test]
    fn test_wall_built_from_stockpiled_steel() {
        let mut engine = engine(8, 3);
        engine.spawn_inventory(TileCoord::new(0, 0), "Steel Plate", 10).unwrap();
        let who = engine.spawn_character(TileCoord::new(1, 1)).unwrap();
        engine.order_build("Wall", TileCoord::new(6, 1)).unwrap();

        run(&mut engine, 10.0);

        let wall = engine.furniture_at(TileCoord::new(6, 1)).unwrap();
        assert_eq!(wall.kind, "Wall");
        drop(wall);
        assert_eq!(engine.inventory().total_of_kind("Steel Plate"), 5);
        let ch = engine.character(who).unwrap();
        assert_eq!(ch.state, CharacterState::Idle);
        assert!(ch.carrying.is_none());
    }

    #[test]
    fn test_unreachable_job_requeued_with_cooldown() {
        let mut engine = engine(6, 3);
        for y in 0..3 {
            engine.place_furniture("Wall", TileCoord::new(3, y)).unwrap();
        }
        let who = engine.spawn_character(TileCoord::new(0, 1)).unwrap();
        let id = engine.submit_job(Job::new(TileCoord::new(5, 1), JobPurpose::Generic, 1.0));

        engine.tick(0.05);
        engine.tick(0.05);

        assert!(engine.jobs().is_queued(id));
        assert_eq!(engine.jobs().queued(), vec![id]);
        let ch = engine.character(who).unwrap();
        assert!(ch.job.is_none());
        assert!(ch.is_cooling_down(id));
    }

    #[test]
    fn test_events_fire_once_per_change() {
        let mut engine = engine(4, 4);
        let created = Rc::new(RefCell::new(0));
        let c = created.clone();
        engine.subscribe(EventKind::FurnitureCreated, move |_| *c.borrow_mut() += 1);
        let changed = Rc::new(RefCell::new(0));
        let c = changed.clone();
        engine.subscribe(EventKind::FurnitureChanged, move |_| *c.borrow_mut() += 1);

        engine.place_furniture("Door", TileCoord::new(1, 1)).unwrap();
        run(&mut engine, 1.0);

        assert_eq!(*created.borrow(), 1);
        assert_eq!(*changed.borrow(), 0);
    }

    #[test]
    fn test_wall_links_notify_neighbours() {
        let mut engine = engine(4, 4);
        let first = engine.place_furniture("Wall", TileCoord::new(1, 1)).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        engine.subscribe(EventKind::FurnitureChanged, move |e| s.borrow_mut().push(e.clone()));

        engine.place_furniture("Wall", TileCoord::new(2, 1)).unwrap();
        assert_eq!(*seen.borrow(), vec![SimEvent::FurnitureChanged(first)]);
    }

    #[test]
    fn test_custom_prototype_catalog() {
        let mut catalog = FurnitureCatalog::default();
        catalog.insert(FurniturePrototype::new("Crate", 2.0));
        let mut engine = SimulationEngine::new(SimConfig::with_size(3, 3), catalog);
        engine.set_tile_type(TileCoord::new(1, 1), TileType::Floor).unwrap();
        engine.place_furniture("Crate", TileCoord::new(1, 1)).unwrap();
        assert_eq!(engine.movement_cost(TileCoord::new(1, 1)), 2.0);
    }

    #[test]
    fn test_door_enterability_polls_open() {
        let mut engine = engine(3, 3);
        let c = TileCoord::new(1, 1);
        engine.place_furniture("Door", c).unwrap();

        assert_eq!(engine.enterability(c), Enterability::Soon);
        let mut opened = false;
        for _ in 0..10 {
            engine.tick(0.05);
            if engine.enterability(c) == Enterability::Yes {
                opened = true;
                break;
            }
        }
        assert!(opened);
        assert_eq!(engine.enterability(TileCoord::new(5, 5)), Enterability::Never);
    }

    fn ring(engine: &mut SimulationEngine, x0: i32, y0: i32, x1: i32, y1: i32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                if x == x0 || x == x1 || y == y0 || y == y1 {
                    engine.place_furniture("Wall", TileCoord::new(x, y)).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_stockpile_hauls_loose_items() {
        let mut engine = engine(10, 3);
        engine.spawn_inventory(TileCoord::new(8, 1), "Steel Plate", 12).unwrap();
        engine.spawn_character(TileCoord::new(5, 1)).unwrap();
        let pile = TileCoord::new(1, 1);
        engine.order_build("Stockpile", pile).unwrap();

        run(&mut engine, 10.0);

        assert_eq!(engine.inventory_at(pile).unwrap().stack_size, 12);
        assert!(engine.inventory_at(TileCoord::new(8, 1)).is_none());
        assert_eq!(engine.inventory().len(), 1);
        let demand = engine
            .jobs()
            .iter()
            .filter(|(_, j)| matches!(j.purpose, JobPurpose::Haul { .. }))
            .count();
        assert_eq!(demand, 1);
    }

    #[test]
    fn test_full_stockpile_drops_demand() {
        let mut engine = engine(4, 4);
        let pile = TileCoord::new(1, 1);
        engine.order_build("Stockpile", pile).unwrap();
        engine.tick(0.05);
        assert_eq!(engine.jobs().len(), 1);

        engine.spawn_inventory(pile, "Steel Plate", 50).unwrap();
        engine.tick(0.05);
        assert_eq!(engine.jobs().live_jobs(), 0);
    }

    #[test]
    fn test_generator_fills_enclosed_room() {
        let mut engine = engine(8, 8);
        ring(&mut engine, 0, 0, 7, 7);
        engine.place_furniture("Oxygen Generator", TileCoord::new(2, 2)).unwrap();
        let inside = TileCoord::new(5, 5);

        run(&mut engine, 2.0);
        let early = engine.room_of(inside).unwrap().gas("O2");
        assert!(early > 0.015 && early < 0.025, "O2 after 2s: {}", early);

        run(&mut engine, 40.0);
        assert!((engine.room_of(inside).unwrap().gas("O2") - 0.2).abs() < 1e-4);
        assert_eq!(engine.rooms().outside().unwrap().gas("O2"), 0.0);
    }

    #[test]
    fn test_generator_outside_does_nothing() {
        let mut engine = engine(4, 4);
        engine.place_furniture("Oxygen Generator", TileCoord::new(1, 1)).unwrap();
        run(&mut engine, 1.0);
        assert!(engine.rooms().outside().unwrap().gases().is_empty());
    }

    #[test]
    fn test_deconstruct_merges_rooms() {
        let mut engine = engine(9, 6);
        ring(&mut engine, 0, 0, 8, 5);
        for y in 1..5 {
            engine.place_furniture("Wall", TileCoord::new(4, y)).unwrap();
        }
        assert_eq!(engine.rooms().enclosed().count(), 2);
        engine.room_of_mut(TileCoord::new(2, 2)).unwrap().set_gas("O2", 0.2);

        engine.spawn_character(TileCoord::new(2, 2)).unwrap();
        let id = engine.order_deconstruct(TileCoord::new(4, 2)).unwrap();
        assert_eq!(
            engine.order_deconstruct(TileCoord::new(4, 2)),
            Err(WorldError::PendingJob { x: 4, y: 2 })
        );
        run(&mut engine, 5.0);

        assert!(engine.jobs().get(id).is_none());
        assert!(engine.furniture_at(TileCoord::new(4, 2)).is_none());
        assert_eq!(engine.rooms().enclosed().count(), 1);
        let room = engine.room_of(TileCoord::new(6, 2)).unwrap();
        assert_eq!(room.size(), 3 * 4 * 2 + 1);
        // 12 tiles at 0.2 and 12 at 0.0 share one atmosphere
        assert!((room.gas("O2") - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_cancel_frees_worker() {
        let mut engine = engine(8, 3);
        let who = engine.spawn_character(TileCoord::new(0, 1)).unwrap();
        let id = engine.submit_job(Job::new(TileCoord::new(7, 1), JobPurpose::Generic, 5.0));
        run(&mut engine, 0.2);
        assert_eq!(engine.character(who).unwrap().job, Some(id));

        assert!(engine.cancel_job(id));
        assert!(!engine.cancel_job(id));
        let ch = engine.character(who).unwrap();
        assert!(ch.job.is_none());
        assert_eq!(ch.state, CharacterState::Idle);
    }

    #[test]
    fn test_spawn_checks_tiles() {
        let mut engine = engine(3, 3);
        engine.place_furniture("Wall", TileCoord::new(1, 1)).unwrap();
        assert_eq!(
            engine.spawn_character(TileCoord::new(1, 1)),
            Err(WorldError::NotWalkable { x: 1, y: 1 })
        );
        assert!(matches!(
            engine.spawn_inventory(TileCoord::new(9, 9), "Steel Plate", 3),
            Err(WorldError::OutOfBounds { .. })
        ));
        let id = engine.spawn_inventory(TileCoord::new(0, 0), "Steel Plate", 80).unwrap();
        assert_eq!(engine.inventory().stack(id).unwrap().stack_size, 50);
    }

    #[test]
    fn test_overlapping_build_orders_rejected() {
        let mut engine = engine(5, 5);
        let id = engine.order_build("Oxygen Generator", TileCoord::new(1, 1)).unwrap();
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            assert_eq!(engine.tile(TileCoord::new(x, y)).unwrap().pending_furniture_job, Some(id));
        }
        assert_eq!(
            engine.order_build("Wall", TileCoord::new(2, 2)),
            Err(WorldError::PendingJob { x: 2, y: 2 })
        );
        assert_eq!(engine.jobs().live_jobs(), 1);

        assert!(engine.cancel_job(id));
        assert!(engine.grid().tiles().all(|t| t.pending_furniture_job.is_none()));
        assert!(engine.order_build("Wall", TileCoord::new(2, 2)).is_ok());
    }

    #[test]
    fn test_deconstruct_claims_whole_furniture() {
        let mut engine = engine(5, 5);
        engine.place_furniture("Oxygen Generator", TileCoord::new(1, 1)).unwrap();
        let id = engine.order_deconstruct(TileCoord::new(2, 2)).unwrap();
        assert_eq!(engine.jobs().get(id).unwrap().tile, TileCoord::new(1, 1));
        assert_eq!(
            engine.order_deconstruct(TileCoord::new(1, 2)),
            Err(WorldError::PendingJob { x: 1, y: 1 })
        );
    }

    #[test]
    fn test_impassable_furniture_refused_over_stack() {
        let mut engine = engine(6, 3);
        let stack = TileCoord::new(2, 1);
        engine.spawn_inventory(stack, "Steel Plate", 10).unwrap();
        assert!(!engine.is_placement_valid("Wall", stack));
        assert_eq!(
            engine.order_build("Wall", stack),
            Err(WorldError::InvalidPlacement {
                kind: "Wall".into(),
                x: 2,
                y: 1
            })
        );
        assert!(engine.is_placement_valid("Door", stack));

        engine.place_furniture("Wall", TileCoord::new(3, 0)).unwrap();
        assert!(matches!(
            engine.spawn_inventory(TileCoord::new(3, 0), "Steel Plate", 5),
            Err(WorldError::Inventory(InventoryError::InvalidTile { x: 3, y: 0 }))
        ));

        engine.spawn_character(TileCoord::new(0, 1)).unwrap();
        engine.order_build("Wall", TileCoord::new(5, 1)).unwrap();
        run(&mut engine, 10.0);
        assert!(engine.furniture_at(TileCoord::new(5, 1)).is_some());
        assert_eq!(engine.inventory().total_of_kind("Steel Plate"), 5);
    }

    #[test]
    fn test_stockpile_switches_demand_to_held_kind() {
        let mut engine = engine(10, 3);
        let pile = TileCoord::new(1, 1);
        engine.order_build("Stockpile", pile).unwrap();
        engine.spawn_inventory(TileCoord::new(8, 1), "Steel Plate", 15).unwrap();
        engine.spawn_character(TileCoord::new(5, 1)).unwrap();
        engine.tick(0.05);
        engine.spawn_inventory(pile, "Copper Wire", 3).unwrap();

        run(&mut engine, 10.0);

        assert_eq!(engine.inventory().total_of_kind("Steel Plate"), 15);
        let held = engine.inventory_at(pile).unwrap();
        assert_eq!((held.kind.as_str(), held.stack_size), ("Copper Wire", 3));
        for (_, job) in engine.jobs().iter() {
            if matches!(job.purpose, JobPurpose::Haul { .. }) {
                assert!(job.requirements.keys().all(|k| k == "Copper Wire"));
            }
        }
    }

    #[test]
    fn test_rejected_delivery_spills_beside_pile() {
        let mut engine = engine(5, 3);
        let pile = TileCoord::new(1, 1);
        let stockpile = engine.place_furniture("Stockpile", pile).unwrap();
        engine.spawn_inventory(pile, "Copper Wire", 3).unwrap();
        let mut job = Job::new(pile, JobPurpose::Haul { stockpile }, 0.0)
            .with_requirement("Steel Plate", 5)
            .from_stockpile(false);
        job.requirements.get_mut("Steel Plate").unwrap().stack_size = 5;
        let id = engine.submit_job(job);
        engine.spawn_character(pile).unwrap();

        engine.tick(0.05);

        assert!(engine.jobs().get(id).is_none());
        assert_eq!(engine.inventory_at(pile).unwrap().kind, "Copper Wire");
        assert_eq!(engine.inventory().total_of_kind("Steel Plate"), 5);
        let spilled = engine.inventory_at(TileCoord::new(1, 2)).unwrap();
        assert_eq!((spilled.kind.as_str(), spilled.stack_size), ("Steel Plate", 5));
    }

    #[test]
    fn test_unneeded_items_not_dropped_on_build_site() {
        let mut engine = engine(6, 3);
        let here = TileCoord::new(1, 1);
        engine.spawn_inventory(here, "Copper Wire", 5).unwrap();
        let who = engine.spawn_character(here).unwrap();
        let fetch = Job::new(TileCoord::new(5, 1), JobPurpose::Generic, 1.0)
            .with_requirement("Copper Wire", 5);
        let id = engine.submit_job(fetch);
        engine.tick(0.05);
        assert!(engine.character(who).unwrap().carrying.is_some());

        engine.cancel_job(id);
        engine.order_build("Wall", here).unwrap();
        engine.tick(0.05);

        assert!(engine.character(who).unwrap().carrying.is_none());
        assert!(engine.inventory_at(here).is_none());
        let dropped = engine.inventory_at(TileCoord::new(1, 2)).unwrap();
        assert_eq!((dropped.kind.as_str(), dropped.stack_size), ("Copper Wire", 5));
    }

    #[test]
    fn test_door_poll_reported_once() {
        let mut engine = engine(3, 3);
        let c = TileCoord::new(1, 1);
        engine.place_furniture("Door", c).unwrap();
        let changed = Rc::new(RefCell::new(0));
        let n = changed.clone();
        engine.subscribe(EventKind::FurnitureChanged, move |_| *n.borrow_mut() += 1);

        assert_eq!(engine.enterability(c), Enterability::Soon);
        assert_eq!(*changed.borrow(), 0);
        engine.tick(0.05);
        assert_eq!(*changed.borrow(), 1);
    }
}
