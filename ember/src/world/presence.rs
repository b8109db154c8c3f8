//! Player presence: join, rejoin (character switch), map changes,
//! disconnects and the inactivity sweep.

use std::sync::Arc;

use ember_config::CONFIG;
use ember_core::{MapId, OdId};
use ember_protocol::client::{CCurrentMonsters, CCurrentPlayers, CPlayerJoined, CPlayerLeft};
use ember_protocol::server::{SChangeMap, SJoin, SRejoin};
use ember_protocol::ClientboundEvent;
use thiserror::Error;

use crate::entity::Player;
use crate::net::Connection;
use crate::server::Server;

/// What a session knows about the player it speaks for.
#[derive(Debug, Clone)]
pub struct Identity {
    pub od_id: OdId,
    pub map_id: MapId,
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join requires odId, name and mapId")]
    MissingIdentity,
}

/// Installs the player into their map's room, hands them the current
/// roster and live monsters, and announces them to everyone else.
pub async fn join(
    server: &Arc<Server>,
    conn: &Connection,
    payload: SJoin,
) -> Result<Identity, JoinError> {
    let (od_id, name, map_id) = match (&payload.od_id, &payload.name, &payload.map_id) {
        (Some(od_id), Some(name), Some(map_id))
            if !od_id.is_empty() && !name.is_empty() && !map_id.is_empty() =>
        {
            (od_id.clone(), name.clone(), map_id.clone())
        }
        _ => return Err(JoinError::MissingIdentity),
    };

    let room = server.ensure_room(&map_id).await;
    let mut state = room.state.lock().await;

    // A re-join with an id the room still holds (say, after a dropped
    // socket the sweep has not reaped yet) silently replaces the ghost.
    state.players.remove(&od_id);

    let player = Player::from_join(od_id.clone(), name, map_id.clone(), payload, conn.clone());

    conn.send(&ClientboundEvent::CurrentPlayers(CCurrentPlayers {
        players: state.players.values().map(Player::snapshot).collect(),
    }));
    conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
        monsters: state.live_monster_snapshots(),
    }));

    let announce = ClientboundEvent::PlayerJoined(CPlayerJoined(player.snapshot()));
    state.players.insert(od_id.clone(), player);
    state.broadcast_except(&od_id, &announce);

    log::info!("{od_id} joined {map_id}");
    Ok(Identity { od_id, map_id })
}

/// Character switch on a live socket: drop every identity the connection
/// owns (and the explicit `oldOdId`, which may sit in another room), then
/// run the normal join flow.
pub async fn rejoin(
    server: &Arc<Server>,
    conn: &Connection,
    current: Option<Identity>,
    payload: SRejoin,
) -> Result<Identity, JoinError> {
    if let Some(identity) = current {
        remove_player(server, &identity.map_id, &identity.od_id).await;
    }
    if let Some(old_od_id) = payload.old_od_id {
        if let Some(map_id) = find_player_room(server, &old_od_id).await {
            remove_player(server, &map_id, &old_od_id).await;
        }
    }
    join(server, conn, payload.join).await
}

/// Atomic room-to-room move. The stored player record travels with the
/// move, so appearance and party survive without a re-send.
pub async fn change_map(
    server: &Arc<Server>,
    conn: &Connection,
    identity: Identity,
    payload: SChangeMap,
) -> Identity {
    let SChangeMap { new_map_id, x, y } = payload;

    if new_map_id == identity.map_id {
        // Repeat changeMap into the current map: confirm membership only.
        if let Some(room) = server.room(&identity.map_id).await {
            let state = room.state.lock().await;
            conn.send(&ClientboundEvent::CurrentPlayers(CCurrentPlayers {
                players: state.players.values().map(Player::snapshot).collect(),
            }));
            conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
                monsters: state.live_monster_snapshots(),
            }));
        }
        return identity;
    }

    let carried = remove_player(server, &identity.map_id, &identity.od_id).await;

    let Some(mut player) = carried else {
        // Swept or never installed; nothing to carry over.
        return Identity {
            od_id: identity.od_id,
            map_id: new_map_id,
        };
    };

    player.map_id = new_map_id.clone();
    player.x = x;
    player.y = y;
    player.velocity_x = 0.0;
    player.velocity_y = 0.0;
    player.last_update = std::time::Instant::now();

    let room = server.ensure_room(&new_map_id).await;
    let mut state = room.state.lock().await;

    conn.send(&ClientboundEvent::CurrentPlayers(CCurrentPlayers {
        players: state.players.values().map(Player::snapshot).collect(),
    }));
    conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
        monsters: state.live_monster_snapshots(),
    }));

    let od_id = identity.od_id.clone();
    let announce = ClientboundEvent::PlayerJoined(CPlayerJoined(player.snapshot()));
    state.players.insert(od_id.clone(), player);
    state.broadcast_except(&od_id, &announce);
    drop(state);

    log::debug!("{od_id} moved {} -> {new_map_id}", identity.map_id);
    Identity {
        od_id,
        map_id: new_map_id,
    }
}

/// Socket gone: leave the room and scrub every per-connection registry.
pub async fn disconnect(server: &Arc<Server>, conn: &Connection, identity: Option<Identity>) {
    if let Some(identity) = identity {
        remove_player(server, &identity.map_id, &identity.od_id).await;
        server.rate.forget(&identity.od_id);
        log::info!("{} disconnected from {}", identity.od_id, identity.map_id);
    }
    server.gm.drop_session(conn.session);
    server.chess.drop_session(conn.session);
    server.party_quest.drop_session(conn.session);
}

/// Removes a player from a room, announces `playerLeft`, and destroys the
/// room if that was the last member. Returns the removed record.
pub async fn remove_player(
    server: &Arc<Server>,
    map_id: &MapId,
    od_id: &OdId,
) -> Option<Player> {
    let room = server.room(map_id).await?;
    let mut state = room.state.lock().await;
    let player = state.players.remove(od_id)?;
    log::debug!("{od_id} left {}", player.map_id);
    state.broadcast(&ClientboundEvent::PlayerLeft(CPlayerLeft {
        id: od_id.clone(),
    }));
    let empty = state.players.is_empty();
    drop(state);
    if empty {
        server.drop_room_if_empty(map_id).await;
    }
    Some(player)
}

async fn find_player_room(server: &Arc<Server>, od_id: &OdId) -> Option<MapId> {
    for room in server.rooms_snapshot().await {
        if room.state.lock().await.players.contains_key(od_id) {
            return Some(room.map_id.clone());
        }
    }
    None
}

/// Every 10 s, reap players whose position stream went silent for longer
/// than the configured timeout, exactly as if they had disconnected.
pub async fn run_inactivity_sweep(server: Arc<Server>) {
    let mut ticker = tokio::time::interval(CONFIG.sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sweep_once(&server).await;
    }
}

pub(crate) async fn sweep_once(server: &Arc<Server>) {
    let timeout = CONFIG.player_timeout;
    for room in server.rooms_snapshot().await {
        let mut state = room.state.lock().await;
        let stale: Vec<OdId> = state
            .players
            .values()
            .filter(|p| p.last_update.elapsed() > timeout)
            .map(|p| p.od_id.clone())
            .collect();
        for od_id in &stale {
            if let Some(player) = state.players.remove(od_id) {
                log::warn!("sweeping inactive player {od_id} from {}", room.map_id);
                state.broadcast(&ClientboundEvent::PlayerLeft(CPlayerLeft {
                    id: od_id.clone(),
                }));
                server.rate.forget(od_id);
                server.gm.drop_session(player.conn.session);
            }
        }
        let empty = state.players.is_empty();
        drop(state);
        if !stale.is_empty() && empty {
            server.drop_room_if_empty(&room.map_id).await;
        }
    }
}
