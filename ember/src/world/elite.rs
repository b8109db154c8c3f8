//! Elite promotion: a wandering timer that occasionally blesses one
//! monster per map, and the GM-gated manual variant.

use std::sync::Arc;
use std::time::Duration;

use ember_protocol::client::CMonsterTransformedElite;
use ember_protocol::server::STransformElite;
use ember_protocol::ClientboundEvent;
use rand::Rng;

use crate::net::Connection;
use crate::server::Server;
use crate::world::presence::Identity;

const ELITE_HP_MULT: f64 = 100.0;
const ELITE_DAMAGE_MULT: f64 = 3.0;
/// Per-room promotion chance each time the timer fires.
const ELITE_CHANCE: f64 = 0.3;
const PROMOTER_DELAY: (Duration, Duration) =
    (Duration::from_secs(2 * 60), Duration::from_secs(7 * 60));

/// Self-rescheduling promoter: sleeps a random 2–7 minutes, sweeps every
/// populated, eligible room, repeats forever.
pub async fn run_promoter(server: Arc<Server>) {
    loop {
        let delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(PROMOTER_DELAY.0..=PROMOTER_DELAY.1)
        };
        tokio::time::sleep(delay).await;
        promote_pass(&server).await;
    }
}

pub(crate) async fn promote_pass(server: &Arc<Server>) {
    for room in server.rooms_snapshot().await {
        if room.map_id.is_promotion_excluded() {
            continue;
        }
        let mut state = room.state.lock().await;
        if state.players.is_empty() || state.current_elite.is_some() {
            continue;
        }

        let mut rng = rand::thread_rng();
        if !rng.gen_bool(ELITE_CHANCE) {
            continue;
        }
        let eligible: Vec<_> = state
            .monsters
            .values()
            .filter(|m| m.elite_eligible())
            .map(|m| m.id.clone())
            .collect();
        if eligible.is_empty() {
            continue;
        }
        let chosen = eligible[rng.gen_range(0..eligible.len())].clone();

        let Some(monster) = state.monsters.get_mut(&chosen) else {
            continue;
        };
        monster.promote_to_elite(ELITE_HP_MULT, ELITE_DAMAGE_MULT);
        let event = elite_event(monster);
        state.current_elite = Some(chosen.clone());
        state.broadcast(&event);
        log::info!("{chosen} promoted to elite on {}", room.map_id);
    }
}

/// Client-initiated promotion for mini-events. Privileged: the sender must
/// hold an authenticated GM session.
pub async fn transform_elite(
    server: &Arc<Server>,
    conn: &Connection,
    identity: &Identity,
    payload: STransformElite,
) {
    if !server.gm.is_gm(conn.session) {
        conn.send(&ClientboundEvent::error("GM authorization required"));
        return;
    }
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(monster) = state.monsters.get_mut(&payload.monster_id) else {
        return;
    };
    if monster.is_dead {
        return;
    }

    monster.original_max_hp = Some(payload.original_max_hp.unwrap_or(monster.max_hp));
    monster.original_damage = Some(payload.original_damage.unwrap_or(monster.damage));
    monster.max_hp = payload.max_hp.unwrap_or(monster.max_hp * ELITE_HP_MULT);
    monster.hp = monster.max_hp;
    monster.damage = payload.damage.unwrap_or(monster.damage * ELITE_DAMAGE_MULT);
    monster.is_elite = true;

    let event = elite_event(monster);
    state.current_elite = Some(payload.monster_id.clone());
    state.broadcast(&event);
}

fn elite_event(monster: &crate::entity::Monster) -> ClientboundEvent {
    ClientboundEvent::MonsterTransformedElite(CMonsterTransformedElite {
        monster_id: monster.id.clone(),
        max_hp: monster.max_hp,
        hp: monster.hp,
        damage: monster.damage,
        original_max_hp: monster.original_max_hp.unwrap_or(monster.max_hp),
        original_damage: monster.original_damage.unwrap_or(monster.damage),
    })
}
