//! Drop generation and ground-item minting. Only the server mints item
//! ids; a client never gets to invent one.

use ember_config::CONFIG;
use ember_core::{unix_millis, ItemId, MONSTER_DROPPER};
use ember_protocol::client::DropSnapshot;
use ember_protocol::server::MonsterTypeDef;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::entity::Monster;
use crate::world::GroundItem;

/// Elite kills roll every table entry at triple rate.
const ELITE_RATE_MULT: f64 = 3.0;
/// And pay gold twenty-fold.
const ELITE_GOLD_MULT: i64 = 20;

const ELITE_BONUS_GOLD: (i64, i64) = (50_000, 100_000);
const ELITE_TICKET_COUNT: (i64, i64) = (2, 5);
const ELITE_SCROLL_COUNT: (i64, i64) = (4, 8);

/// A freshly minted drop: the authoritative ground item plus the wire
/// snapshot (which additionally carries the scatter velocities).
pub struct MintedDrop {
    pub item: GroundItem,
    pub snapshot: DropSnapshot,
}

/// Rolls the full drop set for a kill. `base` is the monster's center;
/// successive drops fan out rightward in 10 px steps.
pub fn generate_monster_drops(
    monster: &Monster,
    def: &MonsterTypeDef,
    rng: &mut impl Rng,
) -> Vec<MintedDrop> {
    let base_x = monster.x + monster.width / 2.0;
    let base_y = monster.y + monster.height / 2.0;
    let rate_mult = if monster.is_elite { ELITE_RATE_MULT } else { 1.0 };

    let mut minter = DropMinter::new(base_x, base_y);

    for entry in &def.loot {
        if !rng.gen_bool((entry.rate * rate_mult).clamp(0.0, 1.0)) {
            continue;
        }
        if entry.is_gold() {
            let min = entry.min.unwrap_or(1);
            let max = entry.max.unwrap_or(min).max(min);
            let mut amount = rng.gen_range(min..=max);
            if monster.is_elite {
                amount *= ELITE_GOLD_MULT;
            }
            minter.gold(amount, rng);
        } else {
            minter.item(&entry.name, rng);
        }
    }

    if monster.is_elite {
        minter.gold(rng.gen_range(ELITE_BONUS_GOLD.0..ELITE_BONUS_GOLD.1), rng);
        for _ in 0..rng.gen_range(ELITE_TICKET_COUNT.0..=ELITE_TICKET_COUNT.1) {
            minter.item("Gachapon Ticket", rng);
        }
        for _ in 0..rng.gen_range(ELITE_SCROLL_COUNT.0..=ELITE_SCROLL_COUNT.1) {
            minter.item("Enhancement Scroll", rng);
        }
    }

    // Celebration table: guaranteed extras on configured monster families.
    for (prefix, name) in &CONFIG.drops.celebration {
        if monster.kind.starts_with(prefix.as_str()) {
            minter.item(name, rng);
        }
    }

    minter.drops
}

struct DropMinter {
    base_x: f64,
    base_y: f64,
    drops: Vec<MintedDrop>,
}

impl DropMinter {
    fn new(base_x: f64, base_y: f64) -> Self {
        Self {
            base_x,
            base_y,
            drops: Vec::new(),
        }
    }

    fn gold(&mut self, amount: i64, rng: &mut impl Rng) {
        self.mint("gold", Some(amount), rng);
    }

    fn item(&mut self, name: &str, rng: &mut impl Rng) {
        self.mint(name, None, rng);
    }

    fn mint(&mut self, name: &str, amount: Option<i64>, rng: &mut impl Rng) {
        let index = self.drops.len();
        let x = self.base_x + index as f64 * 10.0;
        let mut item = GroundItem::plain(
            mint_drop_id(index, rng),
            name.to_owned(),
            x,
            self.base_y,
            MONSTER_DROPPER.to_owned(),
        );
        item.amount = amount;
        item.is_gold = amount.is_some();
        let (velocity_x, velocity_y) = scatter_velocity(rng);
        let snapshot = item.snapshot(velocity_x, velocity_y);
        self.drops.push(MintedDrop { item, snapshot });
    }
}

/// `drop_<ts>_<idx>_<rand>`; the room lock makes the index collision-free
/// within a kill, the suffix keeps concurrent kills on one map apart.
fn mint_drop_id(index: usize, rng: &mut impl Rng) -> ItemId {
    ItemId::new(format!(
        "drop_{}_{}_{}",
        unix_millis(),
        index,
        rand_suffix(rng)
    ))
}

/// `pdrop_<ts>_<rand>` for player-initiated drops.
pub fn mint_player_drop_id(rng: &mut impl Rng) -> ItemId {
    ItemId::new(format!("pdrop_{}_{}", unix_millis(), rand_suffix(rng)))
}

pub fn scatter_velocity(rng: &mut impl Rng) -> (f64, f64) {
    let (vx_min, vx_max) = CONFIG.drops.velocity_x;
    let (vy_min, vy_max) = CONFIG.drops.velocity_y;
    (rng.gen_range(vx_min..vx_max), rng.gen_range(vy_min..vy_max))
}

fn rand_suffix(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect()
}
