//! Pure-relay ingress payloads. The server never interprets these; they
//! are forwarded to the rest of the sender's room with the sender's id
//! attached, so each is an opaque map.

use serde::Deserialize;

use crate::JsonMap;

macro_rules! relay_payload {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub JsonMap);
    };
}

relay_payload!(
    /// `playerVFX` → `remotePlayerVFX`.
    SPlayerVfx
);

relay_payload!(
    /// `playerProjectile` → `remoteProjectile`.
    SPlayerProjectile
);

relay_payload!(
    /// `playerProjectileHit` → `remoteProjectileHit`.
    SPlayerProjectileHit
);

relay_payload!(
    /// `playerSkillVFX` → `remoteSkillVFX`.
    SPlayerSkillVfx
);

relay_payload!(
    /// `updateAppearance` → `playerAppearanceUpdated`. The diff is also
    /// merged into the stored appearance so late joiners see it.
    SUpdateAppearance
);

relay_payload!(
    /// `playerDeath` → `playerDied`.
    SPlayerDeath
);

relay_payload!(
    /// `playerRespawn` → `playerRespawned`.
    SPlayerRespawn
);
