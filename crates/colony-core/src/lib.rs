//! Colony Core - Tile-Grid Colony Simulation Engine
//!
//! A headless simulation of a base built tile by tile: characters take jobs
//! from a shared queue, haul materials, build and tear down furniture, and
//! walk between enclosed rooms that track their own atmosphere.
//!
//! # Architecture
//!
//! - **Grid**: a fixed rectangle of tiles, each Empty or Floor, optionally
//!   carrying one furniture and one item stack
//! - **Components**: pure data (tiles, furniture, characters, jobs, stacks,
//!   rooms). Furniture and characters are `hecs` entities
//! - **Systems**: logic over that data. Room flood fill, the job queue, the
//!   stack manager, the path graph with A*, and the per-tick furniture and
//!   character updates
//! - **Engine**: owns everything, takes commands and publishes [`SimEvent`]s
//!   to subscribers
//!
//! # Example
//!
//! ```rust,no_run
//! use colony_core::prelude::*;
//! use colony_core::generation::fill_floor;
//!
//! let mut engine = SimulationEngine::with_builtin_catalog(SimConfig::with_size(32, 32))
//!     .expect("builtin catalog");
//! fill_floor(&mut engine, TileCoord::new(0, 0), TileCoord::new(31, 31)).unwrap();
//!
//! engine.spawn_inventory(TileCoord::new(1, 1), "Steel Plate", 20).unwrap();
//! engine.spawn_character(TileCoord::new(4, 4)).unwrap();
//! engine.order_build("Wall", TileCoord::new(10, 10)).unwrap();
//!
//! loop {
//!     engine.tick(1.0 / 60.0);
//! }
//! ```
//!
//! [`SimEvent`]: events::SimEvent

pub mod catalog;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod generation;
pub mod grid;
pub mod persistence;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::catalog::{FurnitureCatalog, FurniturePrototype};
    pub use crate::components::*;
    pub use crate::config::{SimConfig, SupplySearch};
    pub use crate::engine::SimulationEngine;
    pub use crate::error::{ConfigError, InventoryError, SaveError, WorldError};
    pub use crate::events::{EventKind, SimEvent, SubscriptionId};
    pub use crate::grid::Grid;
    pub use crate::systems::{Announce, PathCache, TilePath};
}
