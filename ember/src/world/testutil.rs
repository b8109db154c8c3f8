//! Shared fixtures for the world tests.

use std::collections::HashMap;
use std::sync::Arc;

use ember_protocol::server::{MonsterTypeDef, SJoin};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::entity::{Monster, SpawnContext};
use crate::net::Connection;
use crate::server::Server;
use crate::world::{MapTopology, Room};

pub fn sjoin(value: Value) -> SJoin {
    serde_json::from_value(value).unwrap()
}

pub fn join_payload(od_id: &str, name: &str, map_id: &str) -> SJoin {
    sjoin(serde_json::json!({"odId": od_id, "name": name, "mapId": map_id}))
}

/// Next queued frame, parsed back into its envelope.
pub fn next_frame(rx: &mut UnboundedReceiver<String>) -> Value {
    let frame = rx.try_recv().expect("expected a queued frame");
    serde_json::from_str(&frame).unwrap()
}

/// Event name of the next queued frame.
pub fn next_event(rx: &mut UnboundedReceiver<String>) -> String {
    next_frame(rx)["event"].as_str().unwrap().to_owned()
}

pub fn drain(rx: &mut UnboundedReceiver<String>) {
    while rx.try_recv().is_ok() {}
}

/// Collects every queued frame's event name.
pub fn drain_events(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let value: Value = serde_json::from_str(&frame).unwrap();
        events.push(value["event"].as_str().unwrap().to_owned());
    }
    events
}

/// A catalog with one unremarkable melee type under the given key.
pub fn basic_catalog(kind: &str) -> Value {
    serde_json::json!({
        kind: {
            "hp": 200.0,
            "speed": 1.5,
            "width": 60.0,
            "height": 50.0,
            "damage": 10.0,
            "loot": [
                {"name": "gold", "rate": 1.0, "min": 10, "max": 20},
                {"name": "Red Potion", "rate": 1.0},
                {"name": "Unlucky Charm", "rate": 0.0},
            ],
        }
    })
}

/// Ensures the room exists and installs a topology with the given catalog.
pub async fn room_with_topology(server: &Arc<Server>, map_id: &str, catalog: Value) -> Arc<Room> {
    let room = server.ensure_room(&map_id.into()).await;
    let catalog: HashMap<String, MonsterTypeDef> = serde_json::from_value(catalog).unwrap();
    room.state.lock().await.topology = Some(MapTopology {
        map_width: 2000.0,
        ground_y: 400.0,
        catalog,
    });
    room
}

/// Installs one live monster of `kind` at x=500 and returns its id.
pub async fn install_monster(server: &Arc<Server>, room: &Arc<Room>, kind: &str) -> ember_core::MonsterId {
    let id = server.next_monster_id();
    let mut state = room.state.lock().await;
    let def = state
        .topology
        .as_ref()
        .unwrap()
        .catalog
        .get(kind)
        .unwrap()
        .clone();
    let monster = Monster::spawn(
        id.clone(),
        &SpawnContext {
            kind: kind.into(),
            x: 500.0,
            y: 300.0,
            surface_x: Some(300.0),
            surface_width: Some(500.0),
        },
        &def,
        &room.map_id,
        2000.0,
        400.0,
        // All-ones: deterministic direction, never shiny.
        &mut rand::rngs::mock::StepRng::new(u64::MAX, 0),
    );
    state.monsters.insert(id.clone(), monster);
    id
}

/// Joins a player through the real presence flow and returns its receiver.
pub async fn join_player(
    server: &Arc<Server>,
    od_id: &str,
    map_id: &str,
) -> (Connection, UnboundedReceiver<String>) {
    let (conn, mut rx) = Connection::test_pair();
    crate::world::presence::join(server, &conn, join_payload(od_id, od_id, map_id))
        .await
        .unwrap();
    drain(&mut rx);
    (conn, rx)
}
