use serde::Deserialize;

/// `updateParty`: join/leave a party. Party membership only drives
/// EXP/gold co-recipient lookup; there is no server-side party state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SUpdateParty {
    #[serde(default)]
    pub party_id: Option<String>,
}

/// `updatePartyStats`: vitals relayed to same-map party members.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SUpdatePartyStats {
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub max_hp: f64,
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub exp: f64,
    #[serde(default)]
    pub max_exp: f64,
}

/// `sharePartyGold`: split looted gold across same-map party members.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SSharePartyGold {
    #[serde(default)]
    pub total_amount: i64,
}
