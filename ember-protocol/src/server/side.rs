//! Side surfaces: the chess pair-router and the party-quest stage relay.
//! Neither shares state with the map rooms.

use serde::Deserialize;

use crate::JsonMap;

/// `chessJoinQueue`: wait for an opponent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SChessJoinQueue {
    #[serde(default)]
    pub name: Option<String>,
}

/// `chessMove`: relayed verbatim to the opponent, no rules validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SChessMove(pub JsonMap);

/// `pqJoin`: subscribe to a party-quest lobby's stage progression.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SPqJoin {
    pub lobby_id: String,
}

/// `pqLeave`: unsubscribe without disconnecting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SPqLeave {
    pub lobby_id: String,
}

/// `pqStageClear`: advance the lobby one step through the stage table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SPqStageClear {
    pub lobby_id: String,
}
