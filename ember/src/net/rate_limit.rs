//! Sliding-window admission control and the damage clamp: the whole of
//! the server's defense against a hostile client.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use ember_config::CONFIG;
use ember_core::OdId;
use parking_lot::Mutex;
use serde_json::Value;

/// Absolute ceiling on a single hit. The sole guard against damage
/// forgery; per-class validation is deliberately out of scope.
pub const MAX_DAMAGE: f64 = 50_000.0;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateAction {
    Attack,
    Pickup,
    Position,
}

impl RateAction {
    fn cap(self) -> usize {
        match self {
            Self::Attack => CONFIG.rate.attacks,
            Self::Pickup => CONFIG.rate.pickups,
            Self::Position => CONFIG.rate.positions,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Pickup => "pickup",
            Self::Position => "position",
        }
    }
}

#[derive(Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<(OdId, RateAction), VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Admits iff fewer than the cap of this action landed within the last
    /// second. Rejections are dropped silently upstream; this logs them.
    pub fn admit(&self, od_id: &OdId, action: RateAction) -> bool {
        self.admit_at(od_id, action, Instant::now())
    }

    fn admit_at(&self, od_id: &OdId, action: RateAction, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        let stamps = buckets.entry((od_id.clone(), action)).or_default();
        while stamps.front().is_some_and(|t| now - *t >= WINDOW) {
            stamps.pop_front();
        }
        if stamps.len() >= action.cap() {
            log::warn!("rate limit: dropping {} from {od_id}", action.label());
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drops every bucket a departing player owns.
    pub fn forget(&self, od_id: &OdId) {
        self.buckets.lock().retain(|(owner, _), _| owner != od_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedDamage {
    pub amount: f64,
    /// True when validation changed the claim; a changed claim can never
    /// count as a critical hit.
    pub altered: bool,
}

/// Clamps a client damage claim: junk and negatives become 0, everything
/// else is floored and capped at [`MAX_DAMAGE`].
pub fn validate_damage(raw: &Value) -> ValidatedDamage {
    let Some(claim) = raw.as_f64().filter(|d| d.is_finite() && *d >= 0.0) else {
        return ValidatedDamage {
            amount: 0.0,
            altered: true,
        };
    };
    let amount = claim.min(MAX_DAMAGE).floor();
    ValidatedDamage {
        amount,
        altered: amount != claim,
    }
}
