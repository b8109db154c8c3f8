//! Combat arbitration: rate-limited damage application, loot attribution,
//! prediction reconciliation and the respawn clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_core::{MapId, MonsterId, OdId};
use ember_protocol::client::{CAttackCorrection, CMonsterDamaged, CMonsterKilled};
use ember_protocol::server::SAttackMonster;
use ember_protocol::ClientboundEvent;
use rand::Rng;

use crate::entity::{AiState, AiType, SpawnContext, EDGE_BUFFER};
use crate::net::rate_limit::{validate_damage, RateAction};
use crate::server::Server;
use crate::world::loot;
use crate::world::presence::Identity;
use crate::world::RoomState;

/// A client HP guess may drift this far before it earns a correction.
const PREDICTION_TOLERANCE: f64 = 50.0;

const KNOCKBACK_VELOCITY: f64 = 6.0;
const KNOCKBACK_DISPLACEMENT: f64 = 30.0;
const KNOCKBACK_FREEZE: Duration = Duration::from_millis(500);

const RESPAWN_DELAY: Duration = Duration::from_secs(8);
const MINI_BOSS_RESPAWN_DELAY: Duration = Duration::from_secs(300);
/// Party-quest corpses linger briefly for the kill animation, then vanish
/// for good.
const PQ_CORPSE_DELAY: Duration = Duration::from_secs(1);

pub async fn attack_monster(server: &Arc<Server>, identity: &Identity, payload: SAttackMonster) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut guard = room.state.lock().await;
    let state = &mut *guard;

    let Some(attacker) = state.players.get(&identity.od_id) else {
        return;
    };
    let attacker_conn = attacker.conn.clone();

    let alive = state
        .monsters
        .get(&payload.monster_id)
        .is_some_and(|m| !m.is_dead);
    if !alive {
        // Stale client state; repair it in private when a seq lets us.
        if payload.seq.is_some() {
            attacker_conn.send(&ClientboundEvent::AttackCorrection(
                CAttackCorrection::monster_not_found(payload.seq),
            ));
        }
        return;
    }

    if !server.rate.admit(&identity.od_id, RateAction::Attack) {
        return;
    }

    let validated = validate_damage(&payload.damage);
    if validated.amount <= 0.0 {
        log::warn!(
            "zero-clamped damage claim from {} on {}",
            identity.od_id,
            payload.monster_id
        );
        return;
    }

    let Some(monster) = state.monsters.get_mut(&payload.monster_id) else {
        return;
    };
    let now = Instant::now();

    state
        .ledgers
        .entry(payload.monster_id.clone())
        .or_default()
        .record(&identity.od_id, validated.amount);

    monster.hp -= validated.amount;
    monster.last_update = now;

    let non_static = monster.ai_type != AiType::Static;
    if non_static {
        monster.ai_state = AiState::Chasing;
        monster.target_player = Some(identity.od_id.clone());
        monster.last_interaction = now;
    }

    let mut knockback_velocity_x = None;
    if non_static {
        let dir = payload
            .player_direction
            .filter(|d| *d == 1.0 || *d == -1.0);
        if let Some(dir) = dir {
            let velocity = dir * KNOCKBACK_VELOCITY;
            monster.x = (monster.x + dir * KNOCKBACK_DISPLACEMENT)
                .clamp(monster.patrol_min_x, monster.patrol_max_x);
            monster.knockback_until = Some(now + KNOCKBACK_FREEZE);
            knockback_velocity_x = Some(velocity);
        }
    }

    let correction = match (payload.seq, payload.predicted_hp) {
        (Some(seq), Some(predicted)) if (monster.hp - predicted).abs() > PREDICTION_TOLERANCE => {
            Some(CAttackCorrection::hp_correction(
                Some(seq),
                monster.hp,
                monster.max_hp,
            ))
        }
        _ => None,
    };

    let dead = monster.hp <= 0.0;
    let damaged = CMonsterDamaged {
        id: payload.monster_id.clone(),
        seq: payload.seq,
        damage: validated.amount,
        current_hp: monster.hp.max(0.0),
        max_hp: monster.max_hp,
        attacker_id: identity.od_id.clone(),
        knockback_velocity_x,
        is_critical: payload.is_critical && !validated.altered,
    };
    state.broadcast(&ClientboundEvent::MonsterDamaged(damaged));

    if dead {
        kill_monster(server, &identity.map_id, state, &payload.monster_id);
    } else if let Some(correction) = correction {
        attacker_conn.send(&ClientboundEvent::AttackCorrection(correction));
    }
}

/// Settles a kill: attribution, drops, broadcast, respawn scheduling.
/// Called with the room lock held.
pub fn kill_monster(
    server: &Arc<Server>,
    map_id: &MapId,
    state: &mut RoomState,
    monster_id: &MonsterId,
) {
    let ledger = state.ledgers.remove(monster_id).unwrap_or_default();
    let loot_recipient: Option<OdId> = ledger.top_contributor().cloned();

    let Some(monster) = state.monsters.get_mut(monster_id) else {
        return;
    };
    monster.is_dead = true;
    monster.hp = 0.0;
    if state.current_elite.as_ref() == Some(monster_id) {
        state.current_elite = None;
    }

    let monster = &state.monsters[monster_id];
    let mut drops = Vec::new();
    if loot_recipient.is_some() {
        if let Some(def) = state
            .topology
            .as_ref()
            .and_then(|t| t.catalog.get(&monster.kind))
        {
            let mut rng = rand::thread_rng();
            for minted in loot::generate_monster_drops(monster, def, &mut rng) {
                drops.push(minted.snapshot);
                state.ground_items.insert(minted.item.id.clone(), minted.item);
            }
        }
    }

    let monster = &state.monsters[monster_id];
    let party_members = loot_recipient
        .as_ref()
        .and_then(|recipient| state.players.get(recipient))
        .and_then(|looter| looter.party_id.as_deref().map(|p| (looter.od_id.clone(), p)))
        .map(|(looter_id, party_id)| {
            state
                .players
                .values()
                .filter(|p| p.od_id != looter_id && p.party_id.as_deref() == Some(party_id))
                .map(|p| p.od_id.clone())
                .collect()
        })
        .unwrap_or_default();

    let killed = CMonsterKilled {
        id: monster_id.clone(),
        kind: monster.kind.clone(),
        x: monster.x,
        y: monster.y,
        loot_recipient,
        drops,
        party_members,
        is_elite_monster: monster.is_elite,
        is_shiny: monster.is_shiny,
    };
    let ctx = monster.spawn_context();
    let is_mini_boss = monster.is_mini_boss;
    let idle_for = monster.last_update.elapsed();
    state.broadcast(&ClientboundEvent::MonsterKilled(killed));

    log::debug!("{monster_id} killed on {map_id} ({idle_for:?} after its last update)");

    if map_id.is_party_quest() {
        tokio::spawn(remove_corpse_after(
            server.clone(),
            map_id.clone(),
            monster_id.clone(),
            PQ_CORPSE_DELAY,
        ));
    } else {
        let delay = if is_mini_boss {
            MINI_BOSS_RESPAWN_DELAY
        } else {
            RESPAWN_DELAY
        };
        tokio::spawn(respawn_after(
            server.clone(),
            map_id.clone(),
            monster_id.clone(),
            ctx,
            delay,
        ));
    }
}

/// Party-quest maps bury their dead and never respawn them.
async fn remove_corpse_after(
    server: Arc<Server>,
    map_id: MapId,
    monster_id: MonsterId,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    let Some(room) = server.room(&map_id).await else {
        return;
    };
    room.state.lock().await.monsters.remove(&monster_id);
}

/// The one-shot respawn. Never cancelled; instead it re-checks the world
/// before acting, so a room destroyed in the meantime makes it a no-op.
async fn respawn_after(
    server: Arc<Server>,
    map_id: MapId,
    monster_id: MonsterId,
    mut ctx: SpawnContext,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    let Some(room) = server.room(&map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    state.monsters.remove(&monster_id);
    if state.players.is_empty() {
        return;
    }

    let mut rng = rand::thread_rng();
    if let (Some(sx), Some(sw)) = (ctx.surface_x, ctx.surface_width) {
        let lo = sx + EDGE_BUFFER;
        let hi = sx + sw - EDGE_BUFFER;
        if hi > lo {
            ctx.x = rng.gen_range(lo..hi);
        }
    }
    state.spawn_monster(server.next_monster_id(), &ctx, &map_id, &mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Connection;
    use crate::world::testutil::*;
    use serde_json::json;

    fn attack(monster_id: &str, value: serde_json::Value) -> SAttackMonster {
        let mut payload = value;
        payload["monsterId"] = json!(monster_id);
        serde_json::from_value(payload).unwrap()
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn shared_kill_credit_goes_to_top_contributor() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let (_b, _b_rx) = join_player(&server, "B", "henesys").await;
        drain(&mut a_rx);
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;

        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };
        let b = Identity {
            od_id: "B".into(),
            map_id: "henesys".into(),
        };

        attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 120, "playerDirection": 1}))).await;
        attack_monster(&server, &b, attack(monster.as_str(), json!({"damage": 50}))).await;
        attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 40}))).await;

        let events = drain_events(&mut a_rx);
        assert_eq!(
            events,
            vec!["monsterDamaged", "monsterDamaged", "monsterDamaged", "monsterKilled"]
        );

        let state = room.state.lock().await;
        let corpse = state.monsters.get(&monster).unwrap();
        assert!(corpse.is_dead);
        assert_eq!(corpse.hp, 0.0);
        assert!(state.ledgers.is_empty());
        drop(state);

        // Re-read the kill payload from B's stream for the attribution.
        let mut b_rx = _b_rx;
        let kill = {
            let mut frame = next_frame(&mut b_rx);
            while frame["event"] != "monsterKilled" {
                frame = next_frame(&mut b_rx);
            }
            frame
        };
        assert_eq!(kill["data"]["lootRecipient"], "A");
        assert_eq!(kill["data"]["partyMembers"], json!([]));
        assert!(!kill["data"]["drops"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prediction_within_tolerance_is_left_alone() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        // hp 200 -> 100; |100 - 50| = 50 is not strictly over the tolerance.
        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"seq": 7, "damage": 100, "predictedHp": 50})),
        )
        .await;
        let events = drain_events(&mut a_rx);
        assert_eq!(events, vec!["monsterDamaged"]);

        // Death supersedes reconciliation: no correction alongside the kill.
        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"seq": 8, "damage": 100, "predictedHp": -50})),
        )
        .await;
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["event"], "monsterDamaged");
        assert_eq!(frame["data"]["currentHp"], 0.0);
        assert_eq!(frame["data"]["seq"], 8);
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["event"], "monsterKilled");
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn prediction_divergence_earns_a_private_correction() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let (_b, mut b_rx) = join_player(&server, "B", "henesys").await;
        drain(&mut a_rx);
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"seq": 3, "damage": 10, "predictedHp": 80})),
        )
        .await;
        // hp 190, predicted 80 -> diverged by 110.
        assert_eq!(next_event(&mut a_rx), "monsterDamaged");
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["event"], "attackCorrection");
        assert_eq!(frame["data"]["type"], "hp_correction");
        assert_eq!(frame["data"]["correctHp"], 190.0);
        // The correction is unicast; the room only saw the damage.
        let b_events = drain_events(&mut b_rx);
        assert_eq!(b_events, vec!["monsterDamaged"]);
    }

    #[tokio::test]
    async fn overcap_damage_is_clamped_and_never_critical() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        {
            let mut state = room.state.lock().await;
            state
                .topology
                .as_mut()
                .unwrap()
                .catalog
                .get_mut("slime")
                .unwrap()
                .hp = 100_000.0;
        }
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"damage": 50_001, "isCritical": true})),
        )
        .await;
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["data"]["damage"], 50_000.0);
        assert_eq!(frame["data"]["isCritical"], false);

        // An honest claim keeps its critical flag.
        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"damage": 500, "isCritical": true})),
        )
        .await;
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["data"]["isCritical"], true);
    }

    #[tokio::test]
    async fn attack_rate_limit_caps_applied_damage() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        {
            let mut state = room.state.lock().await;
            state
                .topology
                .as_mut()
                .unwrap()
                .catalog
                .get_mut("slime")
                .unwrap()
                .hp = 100_000.0;
        }
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        for _ in 0..12 {
            attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 10}))).await;
        }
        let events = drain_events(&mut a_rx);
        assert_eq!(events.iter().filter(|e| *e == "monsterDamaged").count(), 10);

        let state = room.state.lock().await;
        let m = state.monsters.get(&monster).unwrap();
        assert_eq!(m.hp, 100_000.0 - 100.0);
        assert_eq!(state.ledgers[&monster].total_for(&"A".into()), 100.0);
    }

    #[tokio::test]
    async fn knockback_displaces_within_patrol_bounds() {
        let server = Server::new();
        let (_a, _a_rx) = join_player(&server, "A", "henesys").await;
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        let before = room.state.lock().await.monsters[&monster].x;
        attack_monster(
            &server,
            &a,
            attack(monster.as_str(), json!({"damage": 10, "playerDirection": 1})),
        )
        .await;
        let state = room.state.lock().await;
        let m = &state.monsters[&monster];
        assert_eq!(m.x, (before + 30.0).min(m.patrol_max_x));
        assert!(m.knockback_until.is_some());
        assert_eq!(m.ai_state, AiState::Chasing);
        assert_eq!(m.target_player.as_ref().unwrap().as_str(), "A");
    }

    #[tokio::test]
    async fn attack_on_missing_monster_corrects_only_with_seq() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };
        room_with_topology(&server, "henesys", basic_catalog("slime")).await;

        attack_monster(&server, &a, attack("m_404", json!({"damage": 10}))).await;
        assert!(a_rx.try_recv().is_err());

        attack_monster(&server, &a, attack("m_404", json!({"seq": 1, "damage": 10}))).await;
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame["event"], "attackCorrection");
        assert_eq!(frame["data"]["reason"], "monster_not_found");
    }

    #[tokio::test(start_paused = true)]
    async fn killed_monster_respawns_after_eight_seconds() {
        let server = Server::new();
        let (_a, mut a_rx) = join_player(&server, "A", "henesys").await;
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 500}))).await;
        drain(&mut a_rx);

        advance(Duration::from_secs(9)).await;

        let state = room.state.lock().await;
        assert!(!state.monsters.contains_key(&monster));
        let respawned: Vec<_> = state.monsters.values().collect();
        assert_eq!(respawned.len(), 1);
        assert!(!respawned[0].is_dead);
        assert_eq!(respawned[0].kind, "slime");
        // Fresh X lands on the remembered surface.
        assert!(respawned[0].x >= 350.0 && respawned[0].x <= 750.0);
        drop(state);
        assert_eq!(drain_events(&mut a_rx), vec!["monsterSpawned"]);
    }

    #[tokio::test(start_paused = true)]
    async fn respawn_into_destroyed_room_is_a_no_op() {
        let server = Server::new();
        let (conn, _rx) = Connection::test_pair();
        let identity = crate::world::presence::join(
            &server,
            &conn,
            join_payload("A", "A", "henesys"),
        )
        .await
        .unwrap();
        let room = room_with_topology(&server, "henesys", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "henesys".into(),
        };

        attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 500}))).await;
        advance(Duration::from_secs(4)).await;
        crate::world::presence::disconnect(&server, &conn, Some(identity)).await;
        assert!(server.room(&"henesys".into()).await.is_none());

        advance(Duration::from_secs(5)).await;
        assert!(server.room(&"henesys".into()).await.is_none());
        // The old Arc'd state stayed cleared.
        assert!(room.state.lock().await.monsters.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn party_quest_corpse_vanishes_without_respawn() {
        let server = Server::new();
        let (_a, _a_rx) = join_player(&server, "A", "pq_stage1").await;
        let room = room_with_topology(&server, "pq_stage1", basic_catalog("slime")).await;
        let monster = install_monster(&server, &room, "slime").await;
        let a = Identity {
            od_id: "A".into(),
            map_id: "pq_stage1".into(),
        };

        attack_monster(&server, &a, attack(monster.as_str(), json!({"damage": 500}))).await;
        advance(Duration::from_secs(2)).await;
        assert!(room.state.lock().await.monsters.is_empty());
        advance(Duration::from_secs(10)).await;
        assert!(room.state.lock().await.monsters.is_empty());
    }
}
