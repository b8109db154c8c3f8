use ember_core::{Direction, Facing, MonsterId, OdId};
use serde::Serialize;

use crate::client::DropSnapshot;

/// Live-monster list for joiners and `requestMonsters` refetches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CCurrentMonsters {
    pub monsters: Vec<MonsterSnapshot>,
}

/// Full state of one live monster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterSnapshot {
    pub id: MonsterId,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub hp: f64,
    pub max_hp: f64,
    pub facing: Facing,
    pub direction: Direction,
    pub ai_state: &'static str,
    pub is_mini_boss: bool,
    pub is_elite_monster: bool,
    pub is_shiny: bool,
    pub can_jump: bool,
    pub is_jumping: bool,
    pub width: f64,
    pub height: f64,
    /// Advisory only; the client owns Y integration.
    pub ground_y: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CMonsterSpawned(pub MonsterSnapshot);

/// Per-tick position fan-out; one entry per live monster.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CMonsterPositions(pub Vec<MonsterPosition>);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterPosition {
    pub id: MonsterId,
    pub x: f64,
    pub y: f64,
    pub facing: Facing,
    pub direction: Direction,
    pub ai_state: &'static str,
    pub velocity_x: f64,
    pub velocity_y: f64,
    /// Server wall-clock millis; lets clients order ticks across frames.
    pub t: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CMonsterDamaged {
    pub id: MonsterId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    pub damage: f64,
    pub current_hp: f64,
    pub max_hp: f64,
    pub attacker_id: OdId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knockback_velocity_x: Option<f64>,
    /// True only when the client's claim survived damage validation.
    pub is_critical: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CMonsterKilled {
    pub id: MonsterId,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loot_recipient: Option<OdId>,
    pub drops: Vec<DropSnapshot>,
    pub party_members: Vec<OdId>,
    pub is_elite_monster: bool,
    pub is_shiny: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CMonsterTransformedElite {
    pub monster_id: MonsterId,
    pub max_hp: f64,
    pub hp: f64,
    pub damage: f64,
    pub original_max_hp: f64,
    pub original_damage: f64,
}

/// Unicast prediction repair. Two shapes share the event: a miss
/// (`reason: "monster_not_found"`) and an HP divergence
/// (`type: "hp_correction"` with the authoritative values).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CAttackCorrection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_hp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<f64>,
}

impl CAttackCorrection {
    pub fn monster_not_found(seq: Option<u64>) -> Self {
        Self {
            seq,
            kind: None,
            reason: Some("monster_not_found"),
            correct_hp: None,
            max_hp: None,
        }
    }

    pub fn hp_correction(seq: Option<u64>, correct_hp: f64, max_hp: f64) -> Self {
        Self {
            seq,
            kind: Some("hp_correction"),
            reason: None,
            correct_hp: Some(correct_hp),
            max_hp: Some(max_hp),
        }
    }
}
