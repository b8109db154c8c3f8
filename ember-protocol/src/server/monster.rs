use std::collections::HashMap;

use ember_core::{MapId, MonsterId};
use serde::Deserialize;
use serde_json::Value;

/// `initMapMonsters`: the first client on a map ships its topology,
/// monster-type catalog and spawn layout. First submission wins; later
/// ones are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SInitMapMonsters {
    pub map_id: MapId,
    #[serde(default)]
    pub monsters: Vec<SpawnCount>,
    #[serde(default)]
    pub spawn_positions: Vec<SpawnPoint>,
    #[serde(default = "default_map_width")]
    pub map_width: f64,
    #[serde(default)]
    pub ground_y: f64,
    #[serde(default)]
    pub monster_types: HashMap<String, MonsterTypeDef>,
}

fn default_map_width() -> f64 {
    2000.0
}

/// Fallback spawner used when no explicit spawn positions were shipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnCount {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_spawn_count")]
    pub count: u32,
}

fn default_spawn_count() -> u32 {
    1
}

/// An explicit spawn with the platform geometry patrol bounds derive from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPoint {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub surface_x: Option<f64>,
    #[serde(default)]
    pub surface_width: Option<f64>,
}

/// One monster-type catalog entry as shipped by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterTypeDef {
    #[serde(default = "default_hp")]
    pub hp: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub ai_type: Option<String>,
    #[serde(default)]
    pub is_mini_boss: bool,
    #[serde(default)]
    pub is_trial_boss: bool,
    #[serde(default)]
    pub can_jump: bool,
    #[serde(default)]
    pub jump_force: f64,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
}

fn default_hp() -> f64 {
    100.0
}

fn default_speed() -> f64 {
    1.0
}

fn default_width() -> f64 {
    64.0
}

fn default_height() -> f64 {
    64.0
}

/// One roll of a monster's drop table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootEntry {
    pub name: String,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl LootEntry {
    /// Gold entries carry an amount range; everything else is an item.
    pub fn is_gold(&self) -> bool {
        self.min.is_some() || self.max.is_some() || self.name == "gold"
    }
}

/// `attackMonster`: the only combat ingress. `damage` is left untyped on
/// purpose: adversarial values (strings, negatives, NaN-ish junk) are
/// zero-clamped by validation, not rejected at the parse edge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SAttackMonster {
    #[serde(default)]
    pub seq: Option<u64>,
    pub monster_id: MonsterId,
    #[serde(default)]
    pub damage: Value,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub player_direction: Option<f64>,
    #[serde(default)]
    pub predicted_hp: Option<f64>,
}

/// `transformElite`: GM-gated manual elite promotion for mini-events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct STransformElite {
    pub monster_id: MonsterId,
    #[serde(default)]
    pub max_hp: Option<f64>,
    #[serde(default)]
    pub damage: Option<f64>,
    #[serde(default)]
    pub original_max_hp: Option<f64>,
    #[serde(default)]
    pub original_damage: Option<f64>,
}
