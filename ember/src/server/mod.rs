pub mod gm;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ember_core::{unix_millis, MapId, MonsterId};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::side::{ChessLobby, PartyQuestRelay};
use crate::net::rate_limit::RateLimiter;
use crate::world::Room;

use gm::GmSessions;

/// Process-wide state. Rooms own everything map-scoped; the only truly
/// global mutables are the registry itself, the monster-id counter, the
/// rate buckets, the GM set and the two side surfaces.
pub struct Server {
    /// Wall-clock millis at boot; sent to every fresh connection.
    pub start_time: u64,
    rooms: RwLock<HashMap<MapId, Arc<Room>>>,
    monster_seq: AtomicU64,
    pub rate: RateLimiter,
    pub gm: GmSessions,
    pub chess: ChessLobby,
    pub party_quest: PartyQuestRelay,
}

impl Server {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start_time: unix_millis(),
            rooms: RwLock::new(HashMap::new()),
            monster_seq: AtomicU64::new(0),
            rate: RateLimiter::default(),
            gm: GmSessions::default(),
            chess: ChessLobby::default(),
            party_quest: PartyQuestRelay::default(),
        })
    }

    pub fn next_monster_id(&self) -> MonsterId {
        MonsterId::from_seq(self.monster_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub async fn room(&self, map_id: &MapId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(map_id).cloned()
    }

    pub async fn ensure_room(&self, map_id: &MapId) -> Arc<Room> {
        if let Some(room) = self.room(map_id).await {
            return room;
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(map_id.clone())
            .or_insert_with(|| {
                log::info!("room created: {map_id}");
                Arc::new(Room::new(map_id.clone()))
            })
            .clone()
    }

    /// Tears the room down iff it still has no players. Pending timers
    /// holding an `Arc<Room>` see the cleared state and no-op; re-lookups
    /// by map id simply miss.
    pub async fn drop_room_if_empty(&self, map_id: &MapId) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(map_id) else {
            return;
        };
        let mut state = room.state.lock().await;
        if !state.players.is_empty() {
            return;
        }
        state.monsters.clear();
        state.topology = None;
        state.ground_items.clear();
        state.ledgers.clear();
        state.current_elite = None;
        drop(state);
        rooms.remove(map_id);
        log::info!("room destroyed: {map_id}");
    }

    /// Registry snapshot for the periodic drivers (tick, sweep, promoter).
    pub async fn rooms_snapshot(&self) -> Vec<Arc<Room>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// `GET /` payload.
    pub async fn health(&self) -> HealthReport {
        let rooms = self.rooms_snapshot().await;
        let mut report = HealthReport {
            status: "ok",
            total_players: 0,
            total_monsters: 0,
            maps: Vec::with_capacity(rooms.len()),
        };
        for room in rooms {
            let state = room.state.lock().await;
            let monsters = state.monsters.values().filter(|m| !m.is_dead).count();
            report.total_players += state.players.len();
            report.total_monsters += monsters;
            report.maps.push(MapHealth {
                id: room.map_id.clone(),
                players: state.players.len(),
                monsters,
            });
        }
        report
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub total_players: usize,
    pub total_monsters: usize,
    pub maps: Vec<MapHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapHealth {
    pub id: MapId,
    pub players: usize,
    pub monsters: usize,
}
