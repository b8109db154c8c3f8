use std::time::Instant;

use ember_core::{Direction, Facing, MapId, MonsterId, OdId};
use ember_protocol::client::{MonsterPosition, MonsterSnapshot};
use ember_protocol::server::MonsterTypeDef;
use rand::Rng;

/// Keeps patrols away from platform edges.
pub const EDGE_BUFFER: f64 = 50.0;
/// Surfaces narrower than this pin the monster in place.
pub const MIN_PATROL_DISTANCE: f64 = 80.0;
/// Patrol half-width used when no surface geometry was supplied.
const DEFAULT_PATROL_RADIUS: f64 = 150.0;

const SHINY_CHANCE: f64 = 0.02;
const SHINY_HP_MULT: f64 = 3.0;

/// Catalog key that never aggros, never turns shiny and never goes elite.
pub const TEST_DUMMY: &str = "testDummy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiType {
    Static,
    Patrolling,
}

impl AiType {
    pub fn from_catalog(raw: Option<&str>) -> Self {
        match raw {
            Some("static") => Self::Static,
            _ => Self::Patrolling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Idle,
    Patrolling,
    Chasing,
}

impl AiState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Patrolling => "patrolling",
            Self::Chasing => "chasing",
        }
    }
}

/// What a kill remembers so the respawn timer can regenerate an
/// equivalent monster later, even after the original is gone.
#[derive(Debug, Clone)]
pub struct SpawnContext {
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub surface_x: Option<f64>,
    pub surface_width: Option<f64>,
}

#[derive(Debug)]
pub struct Monster {
    pub id: MonsterId,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub direction: Direction,
    pub facing: Facing,
    pub hp: f64,
    pub max_hp: f64,
    pub damage: f64,
    pub speed: f64,
    pub ai_type: AiType,
    pub ai_state: AiState,
    pub is_dead: bool,
    pub is_mini_boss: bool,
    pub is_trial_boss: bool,
    pub is_elite: bool,
    pub is_shiny: bool,
    pub can_jump: bool,
    pub is_jumping: bool,
    pub width: f64,
    pub height: f64,
    pub patrol_min_x: f64,
    pub patrol_max_x: f64,
    /// Half-width of the patrol range at spawn; de-aggro re-centers with it.
    pub patrol_radius: f64,
    /// Surface too narrow to walk: the monster idles at its center and
    /// never takes the patrol path.
    pub pinned: bool,
    pub surface_x: Option<f64>,
    pub surface_width: Option<f64>,
    pub spawn_x: f64,
    pub spawn_y: f64,
    pub ground_y: f64,
    pub target_player: Option<OdId>,
    pub knockback_until: Option<Instant>,
    pub last_interaction: Instant,
    pub last_update: Instant,
    pub original_max_hp: Option<f64>,
    pub original_damage: Option<f64>,
}

impl Monster {
    pub fn spawn(
        id: MonsterId,
        ctx: &SpawnContext,
        def: &MonsterTypeDef,
        map_id: &MapId,
        map_width: f64,
        ground_y: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let ai_type = AiType::from_catalog(def.ai_type.as_deref());
        let (patrol_min_x, patrol_max_x, pinned) =
            patrol_bounds(ctx.x, ctx.surface_x, ctx.surface_width, map_width);

        let direction = if rng.gen_bool(0.5) {
            Direction::Left
        } else {
            Direction::Right
        };

        let mut max_hp = def.hp;
        let mut is_shiny = false;
        let shiny_eligible = !def.is_mini_boss
            && !def.is_trial_boss
            && ctx.kind != TEST_DUMMY
            && !map_id.is_promotion_excluded();
        if shiny_eligible && rng.gen_bool(SHINY_CHANCE) {
            is_shiny = true;
            max_hp *= SHINY_HP_MULT;
        }

        let ai_state = if ai_type == AiType::Static || pinned {
            AiState::Idle
        } else {
            AiState::Patrolling
        };

        let now = Instant::now();
        Self {
            id,
            kind: ctx.kind.clone(),
            x: ctx.x,
            y: ctx.y,
            velocity_x: 0.0,
            velocity_y: 0.0,
            direction,
            facing: direction.into(),
            hp: max_hp,
            max_hp,
            damage: def.damage,
            speed: def.speed,
            ai_type,
            ai_state,
            is_dead: false,
            is_mini_boss: def.is_mini_boss,
            is_trial_boss: def.is_trial_boss,
            is_elite: false,
            is_shiny,
            can_jump: def.can_jump,
            is_jumping: false,
            width: def.width,
            height: def.height,
            patrol_min_x,
            patrol_max_x,
            patrol_radius: (patrol_max_x - patrol_min_x) / 2.0,
            pinned,
            surface_x: ctx.surface_x,
            surface_width: ctx.surface_width,
            spawn_x: ctx.x,
            spawn_y: ctx.y,
            ground_y,
            target_player: None,
            knockback_until: None,
            last_interaction: now,
            last_update: now,
            original_max_hp: None,
            original_damage: None,
        }
    }

    /// The respawn context to remember when this monster dies.
    pub fn spawn_context(&self) -> SpawnContext {
        SpawnContext {
            kind: self.kind.clone(),
            x: self.spawn_x,
            y: self.spawn_y,
            surface_x: self.surface_x,
            surface_width: self.surface_width,
        }
    }

    pub fn in_knockback(&self, now: Instant) -> bool {
        self.knockback_until.is_some_and(|until| until > now)
    }

    /// Drops chase state and re-centers the patrol range on the current
    /// position so the monster resumes patrolling here instead of snapping
    /// back to its spawn.
    pub fn deaggro(&mut self, map_width: f64) {
        self.ai_state = if self.pinned {
            AiState::Idle
        } else {
            AiState::Patrolling
        };
        self.target_player = None;
        let radius = self.patrol_radius;
        self.patrol_min_x = (self.x - radius).max(0.0);
        self.patrol_max_x = (self.x + radius).min(map_width - EDGE_BUFFER);
        if self.patrol_max_x < self.patrol_min_x {
            self.patrol_max_x = self.patrol_min_x;
        }
        self.spawn_x = self.x;
    }

    pub fn promote_to_elite(&mut self, max_hp_mult: f64, damage_mult: f64) {
        self.original_max_hp = Some(self.max_hp);
        self.original_damage = Some(self.damage);
        self.max_hp *= max_hp_mult;
        self.hp = self.max_hp;
        self.damage *= damage_mult;
        self.is_elite = true;
    }

    pub fn elite_eligible(&self) -> bool {
        !self.is_dead
            && !self.is_mini_boss
            && !self.is_trial_boss
            && !self.is_elite
            && self.kind != TEST_DUMMY
    }

    pub fn snapshot(&self) -> MonsterSnapshot {
        MonsterSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            x: self.x,
            y: self.y,
            hp: self.hp,
            max_hp: self.max_hp,
            facing: self.facing,
            direction: self.direction,
            ai_state: self.ai_state.as_str(),
            is_mini_boss: self.is_mini_boss,
            is_elite_monster: self.is_elite,
            is_shiny: self.is_shiny,
            can_jump: self.can_jump,
            is_jumping: self.is_jumping,
            width: self.width,
            height: self.height,
            ground_y: self.ground_y,
        }
    }

    pub fn position_entry(&self, server_time: u64) -> MonsterPosition {
        MonsterPosition {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            facing: self.facing,
            direction: self.direction,
            ai_state: self.ai_state.as_str(),
            velocity_x: self.velocity_x,
            velocity_y: self.velocity_y,
            t: server_time,
        }
    }
}

/// Patrol range for a spawn point. Returns `(min, max, pinned)`; a pinned
/// monster sits idle within ±10 of its surface center because the platform
/// is too narrow to walk.
fn patrol_bounds(
    x: f64,
    surface_x: Option<f64>,
    surface_width: Option<f64>,
    map_width: f64,
) -> (f64, f64, bool) {
    if let (Some(sx), Some(sw)) = (surface_x, surface_width) {
        let lo = (sx + EDGE_BUFFER).clamp(0.0, map_width - EDGE_BUFFER);
        let hi = (sx + sw - EDGE_BUFFER).clamp(0.0, map_width - EDGE_BUFFER);
        if hi - lo < MIN_PATROL_DISTANCE {
            let center = (lo + hi) / 2.0;
            return (center - 10.0, center + 10.0, true);
        }
        return (lo, hi, false);
    }
    (
        (x - DEFAULT_PATROL_RADIUS).max(0.0),
        (x + DEFAULT_PATROL_RADIUS).min(map_width - EDGE_BUFFER),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn def() -> MonsterTypeDef {
        serde_json::from_value(serde_json::json!({
            "hp": 200.0,
            "speed": 1.5,
            "width": 60.0,
            "height": 50.0,
        }))
        .unwrap()
    }

    fn spawn_at(x: f64, surface: Option<(f64, f64)>) -> Monster {
        let ctx = SpawnContext {
            kind: "slime".into(),
            x,
            y: 300.0,
            surface_x: surface.map(|s| s.0),
            surface_width: surface.map(|s| s.1),
        };
        // All-ones output makes every gen_bool roll false: no shiny, and a
        // deterministic spawn direction.
        let mut rng = StepRng::new(u64::MAX, 0);
        Monster::spawn(
            MonsterId::from_seq(1),
            &ctx,
            &def(),
            &MapId::from("henesys"),
            2000.0,
            400.0,
            &mut rng,
        )
    }

    #[test]
    fn wide_surface_gets_buffered_bounds() {
        let monster = spawn_at(500.0, Some((400.0, 300.0)));
        assert_eq!(monster.patrol_min_x, 450.0);
        assert_eq!(monster.patrol_max_x, 650.0);
        assert_eq!(monster.ai_state, AiState::Patrolling);
    }

    #[test]
    fn narrow_surface_pins_the_monster() {
        // 150 wide minus both buffers leaves 50 < MIN_PATROL_DISTANCE.
        let monster = spawn_at(475.0, Some((400.0, 150.0)));
        assert_eq!(monster.ai_state, AiState::Idle);
        assert!(monster.pinned);
        let center = (monster.patrol_min_x + monster.patrol_max_x) / 2.0;
        assert_eq!(monster.patrol_max_x - monster.patrol_min_x, 20.0);
        assert!((center - 475.0).abs() <= 10.0 + 1e-9);
    }

    #[test]
    fn no_surface_patrols_around_spawn() {
        let monster = spawn_at(100.0, None);
        assert_eq!(monster.patrol_min_x, 0.0);
        assert_eq!(monster.patrol_max_x, 250.0);
    }

    #[test]
    fn deaggro_recenters_without_snap_back() {
        let mut monster = spawn_at(500.0, Some((400.0, 300.0)));
        monster.ai_state = AiState::Chasing;
        monster.x = 900.0;
        monster.deaggro(2000.0);
        assert_eq!(monster.ai_state, AiState::Patrolling);
        assert_eq!(monster.spawn_x, 900.0);
        assert_eq!(monster.patrol_min_x, 800.0);
        assert_eq!(monster.patrol_max_x, 1000.0);
        assert!(monster.target_player.is_none());
    }

    #[test]
    fn elite_promotion_keeps_originals() {
        let mut monster = spawn_at(500.0, None);
        monster.promote_to_elite(100.0, 3.0);
        assert_eq!(monster.original_max_hp, Some(200.0));
        assert_eq!(monster.max_hp, 20_000.0);
        assert_eq!(monster.hp, 20_000.0);
        assert!(monster.is_elite);
        assert!(!monster.elite_eligible());
    }
}
