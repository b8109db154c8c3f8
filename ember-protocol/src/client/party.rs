use ember_core::OdId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPartyMemberStats {
    pub id: OdId,
    pub hp: f64,
    pub max_hp: f64,
    pub level: f64,
    pub exp: f64,
    pub max_exp: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerPartyUpdated {
    pub id: OdId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
}

/// Unicast to each same-map party member on a gold split.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPartyGoldShare {
    pub amount: i64,
    pub from_name: String,
}

/// Unicast back to the looter with their remainder share.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPartyGoldShareResult {
    pub original_amount: i64,
    pub your_share: i64,
    pub member_count: usize,
}
