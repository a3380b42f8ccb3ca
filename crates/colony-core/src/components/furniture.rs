//! Installed furniture and its per-kind behaviour state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{JobId, TileCoord};

/// Behaviour declared by a prototype in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorSpec {
    #[default]
    None,
    Door,
    Stockpile {
        item: String,
        max_stack: u32,
    },
    GasGenerator {
        gas: String,
        rate: f32,
        ceiling: f32,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoorState {
    /// 0 = shut, 1 = fully open.
    pub openness: f32,
    /// Set when a character asks to pass; cleared once fully open.
    pub is_opening: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockpileState {
    /// Item requested while the pile is empty.
    pub item: String,
    pub max_stack: u32,
    /// Outstanding haul job, at most one.
    pub demand_job: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GasGenerator {
    pub gas: String,
    /// Gas added per second.
    pub rate: f32,
    /// Generation stops once the room reaches this level.
    pub ceiling: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Behavior {
    #[default]
    None,
    Door(DoorState),
    Stockpile(StockpileState),
    GasGenerator(GasGenerator),
}

impl From<&BehaviorSpec> for Behavior {
    fn from(spec: &BehaviorSpec) -> Self {
        match spec {
            BehaviorSpec::None => Behavior::None,
            BehaviorSpec::Door => Behavior::Door(DoorState::default()),
            BehaviorSpec::Stockpile { item, max_stack } => Behavior::Stockpile(StockpileState {
                item: item.clone(),
                max_stack: *max_stack,
                demand_job: None,
            }),
            BehaviorSpec::GasGenerator { gas, rate, ceiling } => {
                Behavior::GasGenerator(GasGenerator {
                    gas: gas.clone(),
                    rate: *rate,
                    ceiling: *ceiling,
                })
            }
        }
    }
}

/// A furniture instance (ECS component). Instances are value copies made
/// from an immutable catalog prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct Furniture {
    pub kind: String,
    /// Bottom-left tile of the footprint.
    pub anchor: TileCoord,
    pub width: u32,
    pub height: u32,
    /// Multiplier on traversal time; 0 = impassable.
    pub movement_cost: f32,
    pub links_to_neighbour: bool,
    pub room_border: bool,
    pub behavior: Behavior,
    /// Data-driven attributes with no typed home.
    pub params: BTreeMap<String, f32>,
}

impl Furniture {
    pub fn footprint(&self) -> impl Iterator<Item = TileCoord> {
        footprint(self.anchor, self.width, self.height)
    }

    pub fn is_door(&self) -> bool {
        matches!(self.behavior, Behavior::Door(_))
    }

    pub fn is_stockpile(&self) -> bool {
        matches!(self.behavior, Behavior::Stockpile(_))
    }

    /// Reads a typed field by its conventional key, falling back to `params`.
    pub fn parameter(&self, name: &str) -> Option<f32> {
        let typed = match (&self.behavior, name) {
            (Behavior::Door(door), "openness") => Some(door.openness),
            (Behavior::Door(door), "is_opening") => Some(if door.is_opening { 1.0 } else { 0.0 }),
            (Behavior::Stockpile(pile), "max_stack") => Some(pile.max_stack as f32),
            (Behavior::GasGenerator(gen), "rate") => Some(gen.rate),
            (Behavior::GasGenerator(gen), "ceiling") => Some(gen.ceiling),
            _ => None,
        };
        typed.or_else(|| self.params.get(name).copied())
    }

    /// Writes a typed field by its conventional key, or a generic param.
    /// Returns true when the stored value changed.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        let before = self.parameter(name);
        match (&mut self.behavior, name) {
            (Behavior::Door(door), "openness") => door.openness = value.clamp(0.0, 1.0),
            (Behavior::Door(door), "is_opening") => door.is_opening = value >= 1.0,
            (Behavior::Stockpile(pile), "max_stack") => pile.max_stack = value.max(0.0) as u32,
            (Behavior::GasGenerator(gen), "rate") => gen.rate = value,
            (Behavior::GasGenerator(gen), "ceiling") => gen.ceiling = value,
            _ => {
                self.params.insert(name.to_string(), value);
            }
        }
        before != self.parameter(name)
    }

    /// Every parameter, typed and generic, keyed by name.
    pub fn parameters(&self) -> BTreeMap<String, f32> {
        let mut all = self.params.clone();
        let keys: &[&str] = match &self.behavior {
            Behavior::None => &[],
            Behavior::Door(_) => &["openness", "is_opening"],
            Behavior::Stockpile(_) => &["max_stack"],
            Behavior::GasGenerator(_) => &["rate", "ceiling"],
        };
        for key in keys {
            if let Some(value) = self.parameter(key) {
                all.insert((*key).to_string(), value);
            }
        }
        all
    }
}

/// Tiles covered by a `width` x `height` rectangle anchored bottom-left.
pub fn footprint(anchor: TileCoord, width: u32, height: u32) -> impl Iterator<Item = TileCoord> {
    let (w, h) = (width.max(1) as i32, height.max(1) as i32);
    (0..w).flat_map(move |dx| (0..h).map(move |dy| anchor.offset(dx, dy)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door() -> Furniture {
        Furniture {
            kind: "Door".into(),
            anchor: TileCoord::new(2, 3),
            width: 1,
            height: 1,
            movement_cost: 1.0,
            links_to_neighbour: false,
            room_border: true,
            behavior: Behavior::from(&BehaviorSpec::Door),
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn test_typed_parameters() {
        let mut furn = door();
        assert_eq!(furn.parameter("openness"), Some(0.0));

        assert!(furn.set_parameter("openness", 3.0));
        assert_eq!(furn.parameter("openness"), Some(1.0));
        assert!(!furn.set_parameter("openness", 1.0));

        furn.set_parameter("tint", 0.5);
        let params = furn.parameters();
        assert_eq!(params.get("tint"), Some(&0.5));
        assert_eq!(params.get("is_opening"), Some(&0.0));
    }

    #[test]
    fn test_footprint() {
        let tiles: Vec<_> = footprint(TileCoord::new(1, 1), 2, 2).collect();
        assert_eq!(tiles.len(), 4);
        assert!(tiles.contains(&TileCoord::new(2, 2)));
        assert!(!tiles.contains(&TileCoord::new(0, 1)));
    }

    #[test]
    fn test_behavior_spec_json() {
        let spec: BehaviorSpec = serde_json::from_str("\"door\"").unwrap();
        assert_eq!(spec, BehaviorSpec::Door);

        let spec: BehaviorSpec =
            serde_json::from_str(r#"{"stockpile": {"item": "Steel Plate", "max_stack": 50}}"#)
                .unwrap();
        assert!(matches!(spec, BehaviorSpec::Stockpile { max_stack: 50, .. }));
    }
}
