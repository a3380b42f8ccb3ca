//! Furniture prototypes and item stack limits.
//!
//! The catalog is immutable once the engine is built. Instances are value
//! copies produced by [`FurniturePrototype::instantiate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Behavior, BehaviorSpec, Furniture, TileCoord};
use crate::error::ConfigError;

/// Stack limit for items the catalog does not list.
pub const DEFAULT_MAX_STACK: u32 = 50;

const BUILTIN_CATALOG: &str = include_str!("../../../data/furniture_prototypes.json");

fn one() -> f32 {
    1.0
}

fn one_u32() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurniturePrototype {
    #[serde(skip)]
    pub kind: String,
    #[serde(default = "one")]
    pub movement_cost: f32,
    #[serde(default = "one_u32")]
    pub width: u32,
    #[serde(default = "one_u32")]
    pub height: u32,
    #[serde(default)]
    pub links_to_neighbour: bool,
    #[serde(default)]
    pub room_border: bool,
    #[serde(default)]
    pub behavior: BehaviorSpec,
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
    /// Seconds of work to build. Negative builds instantly.
    #[serde(default = "one")]
    pub build_time: f32,
    #[serde(default)]
    pub materials: BTreeMap<String, u32>,
}

impl FurniturePrototype {
    pub fn new(kind: &str, movement_cost: f32) -> Self {
        Self {
            kind: kind.to_string(),
            movement_cost,
            width: 1,
            height: 1,
            links_to_neighbour: false,
            room_border: false,
            behavior: BehaviorSpec::None,
            params: BTreeMap::new(),
            build_time: 1.0,
            materials: BTreeMap::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn room_border(mut self) -> Self {
        self.room_border = true;
        self
    }

    pub fn linked(mut self) -> Self {
        self.links_to_neighbour = true;
        self
    }

    pub fn with_behavior(mut self, behavior: BehaviorSpec) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_recipe(mut self, build_time: f32, materials: &[(&str, u32)]) -> Self {
        self.build_time = build_time;
        self.materials = materials
            .iter()
            .map(|(kind, amount)| (kind.to_string(), *amount))
            .collect();
        self
    }

    /// A fresh instance anchored at `anchor`. Parameters are deep-copied.
    pub fn instantiate(&self, anchor: TileCoord) -> Furniture {
        Furniture {
            kind: self.kind.clone(),
            anchor,
            width: self.width,
            height: self.height,
            movement_cost: self.movement_cost,
            links_to_neighbour: self.links_to_neighbour,
            room_border: self.room_border,
            behavior: Behavior::from(&self.behavior),
            params: self.params.clone(),
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.movement_cost < 0.0 {
            problems.push(format!("negative movement cost {}", self.movement_cost));
        }
        if self.width == 0 || self.height == 0 {
            problems.push(format!("empty footprint {}x{}", self.width, self.height));
        }
        if let BehaviorSpec::Stockpile { max_stack: 0, .. } = self.behavior {
            problems.push("stockpile with zero capacity".to_string());
        }
        for (item, amount) in &self.materials {
            if *amount == 0 {
                problems.push(format!("zero amount of {item} in recipe"));
            }
        }
        problems
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FurnitureCatalog {
    #[serde(default)]
    items: BTreeMap<String, u32>,
    #[serde(default)]
    furniture: BTreeMap<String, FurniturePrototype>,
}

impl FurnitureCatalog {
    /// The catalog shipped in `data/furniture_prototypes.json`.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut catalog: FurnitureCatalog = serde_json::from_str(json)?;
        for (kind, proto) in catalog.furniture.iter_mut() {
            proto.kind = kind.clone();
        }
        if let Some(err) = catalog.validate().into_iter().next() {
            return Err(err);
        }
        log::info!(
            "Loaded {} furniture prototypes, {} item kinds",
            catalog.furniture.len(),
            catalog.items.len()
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, proto: FurniturePrototype) {
        self.furniture.insert(proto.kind.clone(), proto);
    }

    pub fn set_item_max_stack(&mut self, kind: &str, max: u32) {
        self.items.insert(kind.to_string(), max);
    }

    pub fn get(&self, kind: &str) -> Option<&FurniturePrototype> {
        self.furniture.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.furniture.keys().map(String::as_str)
    }

    pub fn item_max_stack(&self, kind: &str) -> u32 {
        self.items.get(kind).copied().unwrap_or(DEFAULT_MAX_STACK)
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        if self.furniture.is_empty() {
            return vec![ConfigError::EmptyCatalog];
        }
        self.furniture
            .values()
            .flat_map(|proto| {
                proto
                    .problems()
                    .into_iter()
                    .map(|reason| ConfigError::InvalidPrototype {
                        kind: proto.kind.clone(),
                        reason,
                    })
            })
            .collect()
    }
}
