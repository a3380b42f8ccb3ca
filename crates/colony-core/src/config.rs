//! Simulation tunables, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How characters pick a supply stack for a job's materials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplySearch {
    /// Closest stack by straight-line distance.
    #[default]
    Nearest,
    /// First admissible stack in registry order.
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    /// Tiles per second across a cost-1 tile.
    pub character_speed: f32,
    /// Door openness gained or lost per second.
    pub door_open_rate: f32,
    pub deconstruct_time: f32,
    /// Seconds a character ignores a job it could not reach.
    pub unreachable_cooldown: f32,
    pub path_cache_capacity: usize,
    pub supply_search: SupplySearch,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            character_speed: 5.0,
            door_open_rate: 4.0,
            deconstruct_time: 1.0,
            unreachable_cooldown: 5.0,
            path_cache_capacity: 256,
            supply_search: SupplySearch::Nearest,
        }
    }
}

impl SimConfig {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Every problem with `config`; empty when it is usable.
pub fn validate_config(config: &SimConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.width == 0 || config.height == 0 {
        errors.push(ConfigError::InvalidDimensions {
            width: config.width,
            height: config.height,
        });
    }
    if config.character_speed <= 0.0 {
        errors.push(ConfigError::NonPositiveSpeed {
            field: "character_speed",
            value: config.character_speed,
        });
    }
    if config.door_open_rate <= 0.0 {
        errors.push(ConfigError::NonPositiveSpeed {
            field: "door_open_rate",
            value: config.door_open_rate,
        });
    }

    errors
}
