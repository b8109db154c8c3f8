use ember_core::{ItemId, OdId};
use serde::Serialize;
use serde_json::Value;

/// One minted drop as it appears inside `monsterKilled` and
/// `playerItemDropped` payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropSnapshot {
    pub id: ItemId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_gold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_req: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_quest_item: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CItemPickedUp {
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub picked_up_by: OdId,
    pub picked_up_by_name: String,
}

/// Unicast to a pickup loser; nobody else hears about it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CItemPickupRejected {
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub reason: &'static str,
}

/// Broadcast to the rest of the room when a player drops something.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerItemDropped {
    #[serde(flatten)]
    pub drop: DropSnapshot,
    pub dropped_by: OdId,
    pub dropped_by_name: String,
}

/// Unicast back to the dropper so it adopts the server-minted id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerDropConfirm {
    pub id: ItemId,
    pub velocity_x: f64,
    pub velocity_y: f64,
}
