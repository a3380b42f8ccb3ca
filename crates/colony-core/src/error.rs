//! Error types for world commands, inventory transfers, configuration and
//! save files.

use thiserror::Error;

/// Rejected world commands. A rejected command leaves the world untouched.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    #[error("tile ({x}, {y}) is outside the world")]
    OutOfBounds { x: i32, y: i32 },

    #[error("cannot place {kind} at ({x}, {y})")]
    InvalidPlacement { kind: String, x: i32, y: i32 },

    #[error("unknown furniture prototype: {0}")]
    UnknownPrototype(String),

    #[error("tile ({x}, {y}) already has a pending furniture job")]
    PendingJob { x: i32, y: i32 },

    #[error("no furniture at ({x}, {y})")]
    NoFurniture { x: i32, y: i32 },

    #[error("tile ({x}, {y}) is occupied")]
    TileOccupied { x: i32, y: i32 },

    #[error("tile ({x}, {y}) cannot be walked on")]
    NotWalkable { x: i32, y: i32 },

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Rejected stack transfers. The source stack is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("cannot merge {found} into a stack of {expected}")]
    KindMismatch { expected: String, found: String },

    #[error("destination stack is full")]
    StackFull,

    #[error("no such stack")]
    UnknownStack,

    #[error("stack is empty")]
    EmptyStack,

    #[error("tile ({x}, {y}) cannot hold items")]
    InvalidTile { x: i32, y: i32 },

    #[error("job does not require {0}")]
    NoRequirement(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(String),

    #[error("furniture catalog is empty")]
    EmptyCatalog,

    #[error("world dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("{field} must be positive, got {value}")]
    NonPositiveSpeed { field: &'static str, value: f32 },

    #[error("prototype {kind}: {reason}")]
    InvalidPrototype { kind: String, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("cannot rebuild world: {0}")]
    World(#[from] WorldError),
}
