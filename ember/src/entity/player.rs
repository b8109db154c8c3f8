use std::time::Instant;

use ember_core::{Facing, MapId, OdId};
use ember_protocol::client::PlayerSnapshot;
use ember_protocol::server::{SJoin, SUpdatePosition};
use ember_protocol::JsonMap;
use serde_json::Value;

use crate::net::Connection;

/// One present player, owned by exactly one room. Everything here is
/// client-reported except identity and timestamps; the server stores it so
/// late joiners can be handed a roster without asking anyone.
#[derive(Debug)]
pub struct Player {
    pub od_id: OdId,
    pub name: String,
    pub map_id: MapId,
    pub x: f64,
    pub y: f64,
    pub facing: Facing,
    pub animation_state: Option<String>,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub level: Option<f64>,
    pub player_class: Option<String>,
    pub guild: Option<Value>,
    pub customization: Option<Value>,
    pub equipped: Option<Value>,
    pub cosmetic_equipped: Option<Value>,
    pub equipped_medal: Option<Value>,
    pub display_medals: Option<Value>,
    pub party_id: Option<String>,
    pub active_buffs: Option<Value>,
    pub pet: Option<Value>,
    /// Refreshed by `updatePosition`; the inactivity sweep reaps on it.
    pub last_update: Instant,
    pub conn: Connection,
}

impl Player {
    /// `od_id`, `name` and `map_id` must already have been validated.
    pub fn from_join(od_id: OdId, name: String, map_id: MapId, join: SJoin, conn: Connection) -> Self {
        Self {
            od_id,
            name,
            map_id,
            x: join.x,
            y: join.y,
            facing: Facing::Right,
            animation_state: None,
            velocity_x: 0.0,
            velocity_y: 0.0,
            level: join.level,
            player_class: join.player_class,
            guild: join.guild,
            customization: join.customization,
            equipped: join.equipped,
            cosmetic_equipped: join.cosmetic_equipped,
            equipped_medal: join.equipped_medal,
            display_medals: join.display_medals,
            party_id: join.party_id,
            active_buffs: None,
            pet: None,
            last_update: Instant::now(),
            conn,
        }
    }

    pub fn apply_position(&mut self, update: SUpdatePosition) {
        self.x = update.x;
        self.y = update.y;
        if let Some(facing) = update.facing {
            self.facing = facing;
        }
        self.animation_state = update.animation_state;
        self.velocity_x = update.velocity_x;
        self.velocity_y = update.velocity_y;
        if update.active_buffs.is_some() {
            self.active_buffs = update.active_buffs;
        }
        if update.pet.is_some() {
            self.pet = update.pet;
        }
        self.last_update = Instant::now();
    }

    /// Folds an `updateAppearance` diff into the stored fields so the next
    /// roster snapshot reflects it. Unknown keys are relayed but not kept.
    pub fn apply_appearance(&mut self, diff: &JsonMap) {
        for (key, value) in diff {
            let slot = match key.as_str() {
                "equipped" => &mut self.equipped,
                "cosmeticEquipped" => &mut self.cosmetic_equipped,
                "customization" => &mut self.customization,
                "guild" => &mut self.guild,
                "equippedMedal" => &mut self.equipped_medal,
                "displayMedals" => &mut self.display_medals,
                _ => continue,
            };
            *slot = Some(value.clone());
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.od_id.clone(),
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            facing: self.facing,
            animation_state: self.animation_state.clone(),
            velocity_x: self.velocity_x,
            velocity_y: self.velocity_y,
            level: self.level,
            player_class: self.player_class.clone(),
            guild: self.guild.clone(),
            customization: self.customization.clone(),
            equipped: self.equipped.clone(),
            cosmetic_equipped: self.cosmetic_equipped.clone(),
            equipped_medal: self.equipped_medal.clone(),
            display_medals: self.display_medals.clone(),
            party_id: self.party_id.clone(),
            active_buffs: self.active_buffs.clone(),
            pet: self.pet.clone(),
        }
    }
}
