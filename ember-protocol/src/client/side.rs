use serde::Serialize;

use crate::JsonMap;

/// Both members of a fresh chess pairing get one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CChessMatched {
    pub color: &'static str,
    pub opponent_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CChessOpponentMove(pub JsonMap);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPqJoined {
    pub lobby_id: String,
    pub stage: &'static str,
    pub stage_index: usize,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CPqStageAdvanced {
    pub lobby_id: String,
    pub stage: &'static str,
    pub stage_index: usize,
}
