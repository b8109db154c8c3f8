pub mod combat;
pub mod elite;
pub mod items;
pub mod loot;
pub mod presence;
pub mod relay;
pub mod simulator;

#[cfg(test)]
pub(crate) mod testutil;

use std::collections::HashMap;

use ember_core::{unix_millis, ItemId, MapId, MonsterId, OdId};
use ember_protocol::client::{CMonsterSpawned, DropSnapshot};
use ember_protocol::server::MonsterTypeDef;
use ember_protocol::ClientboundEvent;
use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::entity::{Monster, Player, SpawnContext};

/// One map's worth of shared truth. Every mutation goes through the one
/// state mutex, which is what gives room members a total order of events.
pub struct Room {
    pub map_id: MapId,
    pub state: Mutex<RoomState>,
}

impl Room {
    pub fn new(map_id: MapId) -> Self {
        Self {
            map_id,
            state: Mutex::new(RoomState::default()),
        }
    }
}

#[derive(Default)]
pub struct RoomState {
    pub players: HashMap<OdId, Player>,
    pub monsters: HashMap<MonsterId, Monster>,
    pub topology: Option<MapTopology>,
    pub ground_items: HashMap<ItemId, GroundItem>,
    pub ledgers: HashMap<MonsterId, DamageLedger>,
    pub current_elite: Option<MonsterId>,
}

/// Map geometry and the monster-type catalog, as shipped by the first
/// client to join. First submission wins for the room's lifetime.
pub struct MapTopology {
    pub map_width: f64,
    pub ground_y: f64,
    pub catalog: HashMap<String, MonsterTypeDef>,
}

impl RoomState {
    /// Serializes once, fans out to every member.
    pub fn broadcast(&self, event: &ClientboundEvent) {
        self.broadcast_inner(None, event);
    }

    /// Same, minus the named member (usually the sender).
    pub fn broadcast_except(&self, skip: &OdId, event: &ClientboundEvent) {
        self.broadcast_inner(Some(skip), event);
    }

    fn broadcast_inner(&self, skip: Option<&OdId>, event: &ClientboundEvent) {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("dropping unencodable broadcast: {err}");
                return;
            }
        };
        for player in self.players.values() {
            if skip.is_some_and(|s| s == &player.od_id) {
                continue;
            }
            player.conn.send_frame(frame.clone());
        }
    }

    pub fn live_monster_snapshots(&self) -> Vec<ember_protocol::client::MonsterSnapshot> {
        self.monsters
            .values()
            .filter(|m| !m.is_dead)
            .map(Monster::snapshot)
            .collect()
    }

    /// Spawns one monster from its context, announces it to the room.
    /// Catalog misses are an invariant break (the context was minted from
    /// the catalog); the spawn is skipped with a log instead of panicking.
    pub fn spawn_monster(
        &mut self,
        id: MonsterId,
        ctx: &SpawnContext,
        map_id: &MapId,
        rng: &mut impl Rng,
    ) {
        let Some(topology) = self.topology.as_ref() else {
            log::error!("spawn into {map_id} before topology arrived");
            return;
        };
        let Some(def) = topology.catalog.get(&ctx.kind) else {
            log::error!("spawn of uncataloged type {} on {map_id}", ctx.kind);
            return;
        };
        let monster = Monster::spawn(
            id.clone(),
            ctx,
            def,
            map_id,
            topology.map_width,
            topology.ground_y,
            rng,
        );
        let announce = ClientboundEvent::MonsterSpawned(CMonsterSpawned(monster.snapshot()));
        self.monsters.insert(id, monster);
        self.broadcast(&announce);
    }
}

/// A dropped item waiting on the floor. Consumable exactly once.
#[derive(Debug, Clone)]
pub struct GroundItem {
    pub id: ItemId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// `odId` of the dropper, or the `__monster__` sentinel.
    pub dropped_by: String,
    pub timestamp: u64,
    pub amount: Option<i64>,
    pub is_gold: bool,
    pub stats: Option<Value>,
    pub rarity: Option<Value>,
    pub enhancement: Option<Value>,
    pub quantity: Option<Value>,
    pub level_req: Option<Value>,
    pub is_quest_item: bool,
}

impl GroundItem {
    pub fn snapshot(&self, velocity_x: f64, velocity_y: f64) -> DropSnapshot {
        DropSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            velocity_x,
            velocity_y,
            amount: self.amount,
            is_gold: self.is_gold,
            stats: self.stats.clone(),
            rarity: self.rarity.clone(),
            enhancement: self.enhancement.clone(),
            quantity: self.quantity.clone(),
            level_req: self.level_req.clone(),
            is_quest_item: self.is_quest_item,
        }
    }

    pub fn plain(id: ItemId, name: String, x: f64, y: f64, dropped_by: String) -> Self {
        Self {
            id,
            name,
            x,
            y,
            dropped_by,
            timestamp: unix_millis(),
            amount: None,
            is_gold: false,
            stats: None,
            rarity: None,
            enhancement: None,
            quantity: None,
            level_req: None,
            is_quest_item: false,
        }
    }
}

/// Cumulative damage per attacker on one monster. Consulted once, at kill
/// time, to attribute loot.
#[derive(Debug, Default)]
pub struct DamageLedger {
    entries: HashMap<OdId, LedgerSlot>,
    seq: u64,
}

#[derive(Debug)]
struct LedgerSlot {
    total: f64,
    /// Ledger sequence of the hit that brought `total` to its value;
    /// breaks ties in favor of whoever reached the shared maximum first.
    last_hit: u64,
}

impl DamageLedger {
    pub fn record(&mut self, od_id: &OdId, amount: f64) {
        self.seq += 1;
        let seq = self.seq;
        let slot = self.entries.entry(od_id.clone()).or_insert(LedgerSlot {
            total: 0.0,
            last_hit: seq,
        });
        slot.total += amount;
        slot.last_hit = seq;
    }

    pub fn top_contributor(&self) -> Option<&OdId> {
        self.entries
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.total
                    .partial_cmp(&b.total)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Lower sequence = reached the shared total earlier.
                    .then(b.last_hit.cmp(&a.last_hit))
            })
            .map(|(od_id, _)| od_id)
    }

    pub fn total_for(&self, od_id: &OdId) -> f64 {
        self.entries.get(od_id).map_or(0.0, |slot| slot.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_argmax_prefers_highest_total() {
        let mut ledger = DamageLedger::default();
        ledger.record(&"a".into(), 120.0);
        ledger.record(&"b".into(), 50.0);
        ledger.record(&"a".into(), 40.0);
        assert_eq!(ledger.top_contributor().unwrap().as_str(), "a");
        assert_eq!(ledger.total_for(&"a".into()), 160.0);
    }

    #[test]
    fn ledger_tie_goes_to_first_to_reach_max() {
        let mut ledger = DamageLedger::default();
        ledger.record(&"a".into(), 100.0);
        ledger.record(&"b".into(), 60.0);
        ledger.record(&"b".into(), 40.0);
        // Both sit at 100, but a's total reached 100 on an earlier hit.
        assert_eq!(ledger.top_contributor().unwrap().as_str(), "a");
    }

    #[test]
    fn empty_ledger_attributes_nobody() {
        assert!(DamageLedger::default().top_contributor().is_none());
    }
}
