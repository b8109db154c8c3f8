use ember_core::{Facing, MapId, OdId};
use serde::Deserialize;
use serde_json::Value;

/// `join`: install a player into a map room. `odId`, `name` and `mapId`
/// are the only required fields; everything else is appearance baggage the
/// server stores and relays untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SJoin {
    #[serde(default)]
    pub od_id: Option<OdId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub map_id: Option<MapId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub customization: Option<Value>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub player_class: Option<String>,
    #[serde(default)]
    pub guild: Option<Value>,
    #[serde(default)]
    pub equipped: Option<Value>,
    #[serde(default)]
    pub cosmetic_equipped: Option<Value>,
    #[serde(default)]
    pub equipped_medal: Option<Value>,
    #[serde(default)]
    pub display_medals: Option<Value>,
    #[serde(default)]
    pub party_id: Option<String>,
}

/// `rejoin`: same as `join`, but first drops every identity the socket
/// currently owns (plus `oldOdId` if it names another one). Character
/// switching without reconnecting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SRejoin {
    #[serde(flatten)]
    pub join: SJoin,
    #[serde(default)]
    pub old_od_id: Option<OdId>,
}

/// `updatePosition`: the client-authoritative transform stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SUpdatePosition {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub facing: Option<Facing>,
    #[serde(default)]
    pub animation_state: Option<String>,
    #[serde(default)]
    pub velocity_x: f64,
    #[serde(default)]
    pub velocity_y: f64,
    #[serde(default)]
    pub active_buffs: Option<Value>,
    #[serde(default)]
    pub pet: Option<Value>,
}

/// `changeMap`: atomic leave plus join at the supplied spawn point.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SChangeMap {
    pub new_map_id: MapId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SChatMessage {
    pub message: String,
}

/// `gmAuth`: present the shared GM password.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SGmAuth {
    #[serde(default)]
    pub password: String,
}

/// `latencyPing`: liveness probe, echoed back in `latencyPong`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SLatencyPing {
    #[serde(default)]
    pub t: Option<f64>,
}
