use ember_core::ItemId;
use serde::Deserialize;
use serde_json::Value;

/// `itemPickup`: claim a ground item. First claim serialized by the room
/// wins; the rest are rejected unicast.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SItemPickup {
    pub item_id: ItemId,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// `playerDropItem`: a player voluntarily drops an item (or gold) from
/// their inventory. The server mints the authoritative id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SPlayerDropItem {
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub stats: Option<Value>,
    #[serde(default)]
    pub rarity: Option<Value>,
    #[serde(default)]
    pub enhancement: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub level_req: Option<Value>,
    #[serde(default)]
    pub is_quest_item: bool,
    #[serde(default)]
    pub is_gold: bool,
    #[serde(default)]
    pub amount: Option<i64>,
}
