use ember_core::{Facing, OdId};
use serde::Serialize;
use serde_json::Value;

/// Sent once per connection so clients can detect server restarts and
/// flush their prediction state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CServerStartTime {
    pub start_time: u64,
}

/// The room roster handed to a fresh joiner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CCurrentPlayers {
    pub players: Vec<PlayerSnapshot>,
}

/// Full visual state of one player, as stored by the room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: OdId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub facing: Facing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_state: Option<String>,
    pub velocity_x: f64,
    pub velocity_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipped: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosmetic_equipped: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipped_medal: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_medals: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_buffs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet: Option<Value>,
}

/// Broadcast to a room when somebody new arrives.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CPlayerJoined(pub PlayerSnapshot);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerMoved {
    pub id: OdId,
    pub x: f64,
    pub y: f64,
    pub facing: Facing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_state: Option<String>,
    pub velocity_x: f64,
    pub velocity_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_buffs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerLeft {
    pub id: OdId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerChat {
    pub id: OdId,
    pub name: String,
    pub message: String,
}

/// Unicast failure report; the only reply malformed ingress gets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CError {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CGmAuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CGmAuthStatus {
    pub is_gm: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CLatencyPong {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    pub server_time: u64,
}
