//! The monster tick: one process-wide timer walks every room, advances
//! each live monster's AI, then fans the room's positions out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_config::CONFIG;
use ember_core::{unix_millis, OdId};
use ember_protocol::client::{CCurrentMonsters, CMonsterPositions};
use ember_protocol::server::SInitMapMonsters;
use ember_protocol::ClientboundEvent;
use rand::Rng;

use crate::entity::{AiState, AiType, Monster, SpawnContext, EDGE_BUFFER};
use crate::net::Connection;
use crate::server::Server;
use crate::world::{MapTopology, RoomState};

/// Reconciles the server cadence with the client's 60 Hz integration at
/// 0.7 local speed (60 · 0.7 / 10). Tuned together with `tick_hz`.
const SPEED_MULTIPLIER: f64 = 4.2;
const CHASE_SPEED_FACTOR: f64 = 1.5;
const CHASE_TIMEOUT: Duration = Duration::from_millis(5000);
const CHASE_RANGE: f64 = 500.0;
const PATROL_CHANGE_CHANCE: f64 = 0.02;
/// Distance from a patrol bound at which the walk direction turns around.
const PATROL_TURN_MARGIN: f64 = 30.0;

pub async fn run(server: Arc<Server>) {
    let mut ticker = tokio::time::interval(CONFIG.tick_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let now = Instant::now();
        for room in server.rooms_snapshot().await {
            let mut state = room.state.lock().await;
            // Fresh handle per room; ThreadRng must not live across awaits.
            let mut rng = rand::thread_rng();
            tick_room(&mut state, now, &mut rng);
        }
    }
}

/// First `initMapMonsters` on a map installs its topology and spawns the
/// initial population; later submissions only get the live list echoed
/// back. First client wins, as the catalog trust model dictates.
pub async fn init_map_monsters(server: &Arc<Server>, conn: &Connection, payload: SInitMapMonsters) {
    let room = server.ensure_room(&payload.map_id).await;
    let mut state = room.state.lock().await;

    if state.topology.is_some() {
        conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
            monsters: state.live_monster_snapshots(),
        }));
        return;
    }

    let map_width = payload.map_width.max(1.0);
    state.topology = Some(MapTopology {
        map_width,
        ground_y: payload.ground_y,
        catalog: payload.monster_types,
    });
    log::info!(
        "topology installed for {}: width {map_width}, {} spawn points",
        payload.map_id,
        payload.spawn_positions.len()
    );

    let mut rng = rand::thread_rng();
    if payload.spawn_positions.is_empty() {
        // No layout shipped: scatter `count` of each type along the ground.
        let hi = (map_width - EDGE_BUFFER).max(EDGE_BUFFER + 1.0);
        for spawner in &payload.monsters {
            for _ in 0..spawner.count {
                let ctx = SpawnContext {
                    kind: spawner.kind.clone(),
                    x: rng.gen_range(EDGE_BUFFER..hi),
                    y: payload.ground_y,
                    surface_x: None,
                    surface_width: None,
                };
                state.spawn_monster(server.next_monster_id(), &ctx, &payload.map_id, &mut rng);
            }
        }
    } else {
        for point in &payload.spawn_positions {
            let ctx = SpawnContext {
                kind: point.kind.clone(),
                x: point.x,
                y: point.y,
                surface_x: point.surface_x,
                surface_width: point.surface_width,
            };
            state.spawn_monster(server.next_monster_id(), &ctx, &payload.map_id, &mut rng);
        }
    }

    conn.send(&ClientboundEvent::CurrentMonsters(CCurrentMonsters {
        monsters: state.live_monster_snapshots(),
    }));
}

/// Advances every live monster, then broadcasts positions if anyone is
/// present. Empty rooms still simulate; monsters do not freeze just
/// because nobody is watching.
pub fn tick_room(state: &mut RoomState, now: Instant, rng: &mut impl Rng) {
    let Some(map_width) = state.topology.as_ref().map(|t| t.map_width) else {
        return;
    };

    let player_x: HashMap<OdId, f64> = state
        .players
        .values()
        .map(|p| (p.od_id.clone(), p.x))
        .collect();

    for monster in state.monsters.values_mut().filter(|m| !m.is_dead) {
        update_monster_ai(monster, &player_x, map_width, now, rng);
    }

    if state.players.is_empty() {
        return;
    }
    let server_time = unix_millis();
    let entries = state
        .monsters
        .values()
        .filter(|m| !m.is_dead)
        .map(|m| m.position_entry(server_time))
        .collect::<Vec<_>>();
    if !entries.is_empty() {
        state.broadcast(&ClientboundEvent::MonsterPositions(CMonsterPositions(
            entries,
        )));
    }
}

pub fn update_monster_ai(
    monster: &mut Monster,
    player_x: &HashMap<OdId, f64>,
    map_width: f64,
    now: Instant,
    rng: &mut impl Rng,
) {
    if monster.ai_type == AiType::Static {
        monster.velocity_x = 0.0;
        return;
    }
    if monster.in_knockback(now) {
        monster.velocity_x = 0.0;
        return;
    }

    if monster.ai_state == AiState::Chasing {
        chase(monster, player_x, map_width, now);
        monster.last_update = now;
        return;
    }

    patrol(monster, map_width, rng);
    monster.last_update = now;
}

fn chase(
    monster: &mut Monster,
    player_x: &HashMap<OdId, f64>,
    map_width: f64,
    now: Instant,
) {
    if now.duration_since(monster.last_interaction) > CHASE_TIMEOUT {
        monster.deaggro(map_width);
        return;
    }

    let target = monster
        .target_player
        .as_ref()
        .and_then(|od_id| player_x.get(od_id).copied());
    let within_leash = (monster.x - monster.spawn_x).abs() < CHASE_RANGE;

    let (Some(target_x), true) = (target, within_leash) else {
        // Target gone or leash exceeded: resume patrolling right here.
        monster.deaggro(map_width);
        return;
    };

    let dir = ember_core::Direction::toward(monster.x, target_x);
    monster.direction = dir;
    monster.facing = dir.into();

    // Pursuit may leave the patrol surface; only the map edges bind.
    let step = dir.sign() * monster.speed * SPEED_MULTIPLIER * CHASE_SPEED_FACTOR;
    let new_x = (monster.x + step).clamp(0.0, map_width - monster.width);
    monster.velocity_x = new_x - monster.x;
    monster.x = new_x;
}

fn patrol(monster: &mut Monster, map_width: f64, rng: &mut impl Rng) {
    if monster.pinned {
        // Too narrow to walk; hold position.
        monster.velocity_x = 0.0;
        monster.ai_state = AiState::Idle;
        return;
    }

    if monster.x <= monster.patrol_min_x + PATROL_TURN_MARGIN {
        monster.direction = ember_core::Direction::Right;
    } else if monster.x >= monster.patrol_max_x - PATROL_TURN_MARGIN {
        monster.direction = ember_core::Direction::Left;
    } else if rng.gen_bool(PATROL_CHANGE_CHANCE) {
        monster.direction = monster.direction.flipped();
    }

    let step = monster.direction.sign() * monster.speed * SPEED_MULTIPLIER;
    let new_x = monster.x + step;
    if new_x >= monster.patrol_min_x && new_x <= monster.patrol_max_x {
        monster.x = new_x;
        monster.velocity_x = step;
    } else {
        monster.x = if new_x < monster.patrol_min_x {
            monster.patrol_min_x
        } else {
            monster.patrol_max_x
        };
        monster.velocity_x = 0.0;
        monster.direction = monster.direction.flipped();
    }

    // Safety net against bounds that drifted outside the map.
    monster.x = monster.x.clamp(0.0, map_width - monster.width);
    monster.facing = monster.direction.into();
    monster.ai_state = AiState::Patrolling;
}
