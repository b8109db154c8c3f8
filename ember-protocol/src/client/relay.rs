//! Relayed visual events: the sender's opaque payload with the sender's
//! id stitched in.

use ember_core::OdId;
use serde::Serialize;

use crate::JsonMap;

macro_rules! relayed_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Serialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub player_id: OdId,
            #[serde(flatten)]
            pub data: JsonMap,
        }

        impl $name {
            pub fn new(player_id: OdId, data: JsonMap) -> Self {
                Self { player_id, data }
            }
        }
    };
}

relayed_event!(CRemotePlayerVfx);
relayed_event!(CRemoteProjectile);
relayed_event!(CRemoteProjectileHit);
relayed_event!(CRemoteSkillVfx);

/// Appearance diffs key on `id` like the other player-keyed broadcasts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerAppearanceUpdated {
    pub id: OdId,
    #[serde(flatten)]
    pub data: JsonMap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerDied {
    pub id: OdId,
    #[serde(flatten)]
    pub data: JsonMap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerRespawned {
    pub id: OdId,
    #[serde(flatten)]
    pub data: JsonMap,
}
