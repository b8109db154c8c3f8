//! The per-map fan-out fabric: movement, chat, VFX, projectiles, party
//! and death/respawn notices. Nothing here touches simulation state
//! beyond the sender's own stored record; rooms exist so members can see
//! one another, and these relays are that visibility.

use std::sync::Arc;

use ember_protocol::client::{
    CPartyMemberStats, CPlayerAppearanceUpdated, CPlayerChat, CPlayerDied, CPlayerMoved,
    CPlayerPartyUpdated, CPlayerRespawned, CRemotePlayerVfx, CRemoteProjectile,
    CRemoteProjectileHit, CRemoteSkillVfx, CCurrentMonsters,
};
use ember_protocol::server::{
    SChatMessage, SPlayerDeath, SPlayerProjectile, SPlayerProjectileHit, SPlayerRespawn,
    SPlayerSkillVfx, SPlayerVfx, SUpdateAppearance, SUpdateParty, SUpdatePartyStats,
    SUpdatePosition,
};
use ember_protocol::ClientboundEvent;

use crate::net::rate_limit::RateAction;
use crate::net::Connection;
use crate::server::Server;
use crate::world::presence::Identity;

/// The transform stream. Rate limited, stored, then fanned out so the
/// room renders the sender where the sender says it is.
pub async fn player_moved(server: &Arc<Server>, identity: &Identity, payload: SUpdatePosition) {
    if !server.rate.admit(&identity.od_id, RateAction::Position) {
        return;
    }
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(player) = state.players.get_mut(&identity.od_id) else {
        return;
    };
    player.apply_position(payload);
    let moved = CPlayerMoved {
        id: player.od_id.clone(),
        x: player.x,
        y: player.y,
        facing: player.facing,
        animation_state: player.animation_state.clone(),
        velocity_x: player.velocity_x,
        velocity_y: player.velocity_y,
        active_buffs: player.active_buffs.clone(),
        pet: player.pet.clone(),
    };
    state.broadcast_except(&identity.od_id, &ClientboundEvent::PlayerMoved(moved));
}

pub async fn chat_message(server: &Arc<Server>, identity: &Identity, payload: SChatMessage) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let state = room.state.lock().await;
    let Some(player) = state.players.get(&identity.od_id) else {
        return;
    };
    let chat = CPlayerChat {
        id: player.od_id.clone(),
        name: player.name.clone(),
        message: payload.message,
    };
    state.broadcast_except(&identity.od_id, &ClientboundEvent::PlayerChat(chat));
}

/// The stored appearance absorbs the diff, then the room hears about it.
pub async fn update_appearance(server: &Arc<Server>, identity: &Identity, payload: SUpdateAppearance) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(player) = state.players.get_mut(&identity.od_id) else {
        return;
    };
    player.apply_appearance(&payload.0);
    let update = CPlayerAppearanceUpdated {
        id: identity.od_id.clone(),
        data: payload.0,
    };
    state.broadcast_except(
        &identity.od_id,
        &ClientboundEvent::PlayerAppearanceUpdated(update),
    );
}

pub async fn update_party(server: &Arc<Server>, identity: &Identity, payload: SUpdateParty) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(player) = state.players.get_mut(&identity.od_id) else {
        return;
    };
    player.party_id = payload.party_id.clone();
    let update = CPlayerPartyUpdated {
        id: identity.od_id.clone(),
        party_id: payload.party_id,
    };
    state.broadcast_except(&identity.od_id, &ClientboundEvent::PlayerPartyUpdated(update));
}

/// Vitals go to same-map party members only; nobody else cares about a
/// stranger's EXP bar.
pub async fn update_party_stats(server: &Arc<Server>, identity: &Identity, payload: SUpdatePartyStats) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let state = room.state.lock().await;
    let Some(sender) = state.players.get(&identity.od_id) else {
        return;
    };
    let Some(party_id) = sender.party_id.as_deref() else {
        return;
    };
    let stats = ClientboundEvent::PartyMemberStats(CPartyMemberStats {
        id: identity.od_id.clone(),
        hp: payload.hp,
        max_hp: payload.max_hp,
        level: payload.level,
        exp: payload.exp,
        max_exp: payload.max_exp,
    });
    for member in state
        .players
        .values()
        .filter(|p| p.od_id != identity.od_id && p.party_id.as_deref() == Some(party_id))
    {
        member.conn.send(&stats);
    }
}

pub async fn player_vfx(server: &Arc<Server>, identity: &Identity, payload: SPlayerVfx) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::RemotePlayerVfx(CRemotePlayerVfx::new(id, payload.0))
    })
    .await;
}

pub async fn player_projectile(server: &Arc<Server>, identity: &Identity, payload: SPlayerProjectile) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::RemoteProjectile(CRemoteProjectile::new(id, payload.0))
    })
    .await;
}

pub async fn player_projectile_hit(
    server: &Arc<Server>,
    identity: &Identity,
    payload: SPlayerProjectileHit,
) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::RemoteProjectileHit(CRemoteProjectileHit::new(id, payload.0))
    })
    .await;
}

pub async fn player_skill_vfx(server: &Arc<Server>, identity: &Identity, payload: SPlayerSkillVfx) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::RemoteSkillVfx(CRemoteSkillVfx::new(id, payload.0))
    })
    .await;
}

pub async fn player_death(server: &Arc<Server>, identity: &Identity, payload: SPlayerDeath) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::PlayerDied(CPlayerDied {
            id,
            data: payload.0,
        })
    })
    .await;
}

pub async fn player_respawn(server: &Arc<Server>, identity: &Identity, payload: SPlayerRespawn) {
    relay_visual(server, identity, |id| {
        ClientboundEvent::PlayerRespawned(CPlayerRespawned {
            id,
            data: payload.0,
        })
    })
    .await;
}

/// `requestMonsters`: hand the asker the live list again.
pub async fn request_monsters(server: &Arc<Server>, conn: &Connection, identity: &Identity) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let state = room.state.lock().await;
    conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
        monsters: state.live_monster_snapshots(),
    }));
}

async fn relay_visual(
    server: &Arc<Server>,
    identity: &Identity,
    build: impl FnOnce(ember_core::OdId) -> ClientboundEvent,
) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let state = room.state.lock().await;
    if !state.players.contains_key(&identity.od_id) {
        return;
    }
    let event = build(identity.od_id.clone());
    state.broadcast_except(&identity.od_id, &event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testutil::*;

    fn identity(od: &str, map: &str) -> Identity {
        Identity {
            od_id: od.into(),
            map_id: map.into(),
        }
    }

    #[tokio::test]
    async fn relays_are_scoped_to_the_room_and_exclude_the_sender() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "a", "henesys").await;
        let (_b, mut b_rx) = join_player(&server, "b", "henesys").await;
        let (_c, mut c_rx) = join_player(&server, "c", "ellinia").await;
        drain(&mut a_rx);

        let payload: SPlayerVfx = serde_json::from_value(serde_json::json!({
            "effect": "slash", "x": 10.0,
        }))
        .unwrap();
        player_vfx(&server, &identity("a", "henesys"), payload).await;

        let frame = next_frame(&mut b_rx);
        assert_eq!(frame["event"], "remotePlayerVFX");
        assert_eq!(frame["data"]["playerId"], "a");
        assert_eq!(frame["data"]["effect"], "slash");
        assert!(a_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn movement_updates_stored_transform_and_fans_out() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "a", "henesys").await;
        let (_b, mut b_rx) = join_player(&server, "b", "henesys").await;
        drain(&mut a_rx);

        let payload: SUpdatePosition = serde_json::from_value(serde_json::json!({
            "x": 77.0, "y": 10.0, "facing": "left", "velocityX": 1.5,
        }))
        .unwrap();
        player_moved(&server, &identity("a", "henesys"), payload).await;

        let frame = next_frame(&mut b_rx);
        assert_eq!(frame["event"], "playerMoved");
        assert_eq!(frame["data"]["x"], 77.0);
        assert_eq!(frame["data"]["facing"], "left");

        let room = server.room(&"henesys".into()).await.unwrap();
        assert_eq!(room.state.lock().await.players[&"a".into()].x, 77.0);
    }

    #[tokio::test]
    async fn party_stats_reach_only_same_map_party_members() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "a", "henesys").await;
        let (_b, mut b_rx) = join_player(&server, "b", "henesys").await;
        let (_c, mut c_rx) = join_player(&server, "c", "henesys").await;
        drain(&mut a_rx);
        drain(&mut b_rx);

        let room = server.room(&"henesys".into()).await.unwrap();
        {
            let mut state = room.state.lock().await;
            state.players.get_mut(&"a".into()).unwrap().party_id = Some("q".into());
            state.players.get_mut(&"b".into()).unwrap().party_id = Some("q".into());
            // c stays partyless.
        }

        let payload: SUpdatePartyStats = serde_json::from_value(serde_json::json!({
            "hp": 55.0, "maxHp": 100.0, "level": 30.0, "exp": 1.0, "maxExp": 2.0,
        }))
        .unwrap();
        update_party_stats(&server, &identity("a", "henesys"), payload).await;

        let frame = next_frame(&mut b_rx);
        assert_eq!(frame["event"], "partyMemberStats");
        assert_eq!(frame["data"]["hp"], 55.0);
        assert!(c_rx.try_recv().is_err());
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn chat_carries_the_stored_name() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "a", "henesys").await;
        let (_b, mut b_rx) = join_player(&server, "b", "henesys").await;
        drain(&mut a_rx);

        chat_message(
            &server,
            &identity("a", "henesys"),
            serde_json::from_value(serde_json::json!({"message": "hello"})).unwrap(),
        )
        .await;
        let frame = next_frame(&mut b_rx);
        assert_eq!(frame["event"], "playerChat");
        assert_eq!(frame["data"]["name"], "a");
        assert_eq!(frame["data"]["message"], "hello");
    }
}
