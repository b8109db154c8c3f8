use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::client::*;
use crate::server::*;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("bad `{event}` payload: {source}")]
    BadPayload {
        event: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Every event a client may send. Decoded through [`ServerboundEvent::decode`]
/// rather than a derived tagged enum so that a missing or `null` `data`
/// field still parses for payloads whose fields are all optional.
#[derive(Debug, Clone)]
pub enum ServerboundEvent {
    Join(SJoin),
    Rejoin(SRejoin),
    UpdatePosition(SUpdatePosition),
    ChangeMap(SChangeMap),
    ChatMessage(SChatMessage),
    InitMapMonsters(SInitMapMonsters),
    AttackMonster(SAttackMonster),
    TransformElite(STransformElite),
    ItemPickup(SItemPickup),
    PlayerDropItem(SPlayerDropItem),
    UpdateParty(SUpdateParty),
    UpdatePartyStats(SUpdatePartyStats),
    SharePartyGold(SSharePartyGold),
    PlayerVfx(SPlayerVfx),
    PlayerProjectile(SPlayerProjectile),
    PlayerProjectileHit(SPlayerProjectileHit),
    PlayerSkillVfx(SPlayerSkillVfx),
    UpdateAppearance(SUpdateAppearance),
    PlayerDeath(SPlayerDeath),
    PlayerRespawn(SPlayerRespawn),
    GmAuth(SGmAuth),
    CheckGmAuth,
    LatencyPing(SLatencyPing),
    RequestMonsters,
    ChessJoinQueue(SChessJoinQueue),
    ChessMove(SChessMove),
    ChessResign,
    PqJoin(SPqJoin),
    PqLeave(SPqLeave),
    PqStageClear(SPqStageClear),
}

macro_rules! payload {
    ($event:literal, $data:expr, $variant:expr) => {
        serde_json::from_value($data)
            .map($variant)
            .map_err(|source| ProtocolError::BadPayload {
                event: $event,
                source,
            })
    };
}

impl ServerboundEvent {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(frame)?;
        let data = match raw.data {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(data) => data,
        };
        Self::from_parts(&raw.event, data)
    }

    fn from_parts(event: &str, data: Value) -> Result<Self, ProtocolError> {
        match event {
            "join" => payload!("join", data, Self::Join),
            "rejoin" => payload!("rejoin", data, Self::Rejoin),
            "updatePosition" => payload!("updatePosition", data, Self::UpdatePosition),
            "changeMap" => payload!("changeMap", data, Self::ChangeMap),
            "chatMessage" => payload!("chatMessage", data, Self::ChatMessage),
            "initMapMonsters" => payload!("initMapMonsters", data, Self::InitMapMonsters),
            "attackMonster" => payload!("attackMonster", data, Self::AttackMonster),
            "transformElite" => payload!("transformElite", data, Self::TransformElite),
            "itemPickup" => payload!("itemPickup", data, Self::ItemPickup),
            "playerDropItem" => payload!("playerDropItem", data, Self::PlayerDropItem),
            "updateParty" => payload!("updateParty", data, Self::UpdateParty),
            "updatePartyStats" => payload!("updatePartyStats", data, Self::UpdatePartyStats),
            "sharePartyGold" => payload!("sharePartyGold", data, Self::SharePartyGold),
            "playerVFX" => payload!("playerVFX", data, Self::PlayerVfx),
            "playerProjectile" => payload!("playerProjectile", data, Self::PlayerProjectile),
            "playerProjectileHit" => {
                payload!("playerProjectileHit", data, Self::PlayerProjectileHit)
            }
            "playerSkillVFX" => payload!("playerSkillVFX", data, Self::PlayerSkillVfx),
            "updateAppearance" => payload!("updateAppearance", data, Self::UpdateAppearance),
            "playerDeath" => payload!("playerDeath", data, Self::PlayerDeath),
            "playerRespawn" => payload!("playerRespawn", data, Self::PlayerRespawn),
            "gmAuth" => payload!("gmAuth", data, Self::GmAuth),
            "checkGmAuth" => Ok(Self::CheckGmAuth),
            "latencyPing" => payload!("latencyPing", data, Self::LatencyPing),
            "requestMonsters" => Ok(Self::RequestMonsters),
            "chessJoinQueue" => payload!("chessJoinQueue", data, Self::ChessJoinQueue),
            "chessMove" => payload!("chessMove", data, Self::ChessMove),
            "chessResign" => Ok(Self::ChessResign),
            "pqJoin" => payload!("pqJoin", data, Self::PqJoin),
            "pqLeave" => payload!("pqLeave", data, Self::PqLeave),
            "pqStageClear" => payload!("pqStageClear", data, Self::PqStageClear),
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Rejoin(_) => "rejoin",
            Self::UpdatePosition(_) => "updatePosition",
            Self::ChangeMap(_) => "changeMap",
            Self::ChatMessage(_) => "chatMessage",
            Self::InitMapMonsters(_) => "initMapMonsters",
            Self::AttackMonster(_) => "attackMonster",
            Self::TransformElite(_) => "transformElite",
            Self::ItemPickup(_) => "itemPickup",
            Self::PlayerDropItem(_) => "playerDropItem",
            Self::UpdateParty(_) => "updateParty",
            Self::UpdatePartyStats(_) => "updatePartyStats",
            Self::SharePartyGold(_) => "sharePartyGold",
            Self::PlayerVfx(_) => "playerVFX",
            Self::PlayerProjectile(_) => "playerProjectile",
            Self::PlayerProjectileHit(_) => "playerProjectileHit",
            Self::PlayerSkillVfx(_) => "playerSkillVFX",
            Self::UpdateAppearance(_) => "updateAppearance",
            Self::PlayerDeath(_) => "playerDeath",
            Self::PlayerRespawn(_) => "playerRespawn",
            Self::GmAuth(_) => "gmAuth",
            Self::CheckGmAuth => "checkGmAuth",
            Self::LatencyPing(_) => "latencyPing",
            Self::RequestMonsters => "requestMonsters",
            Self::ChessJoinQueue(_) => "chessJoinQueue",
            Self::ChessMove(_) => "chessMove",
            Self::ChessResign => "chessResign",
            Self::PqJoin(_) => "pqJoin",
            Self::PqLeave(_) => "pqLeave",
            Self::PqStageClear(_) => "pqStageClear",
        }
    }
}

/// Every event the server may emit, serialized as
/// `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientboundEvent {
    ServerStartTime(CServerStartTime),
    CurrentPlayers(CCurrentPlayers),
    PlayerJoined(CPlayerJoined),
    PlayerMoved(CPlayerMoved),
    PlayerLeft(CPlayerLeft),
    PlayerChat(CPlayerChat),
    CurrentMonsters(CCurrentMonsters),
    MonsterSpawned(CMonsterSpawned),
    MonsterPositions(CMonsterPositions),
    MonsterDamaged(CMonsterDamaged),
    MonsterKilled(CMonsterKilled),
    MonsterTransformedElite(CMonsterTransformedElite),
    AttackCorrection(CAttackCorrection),
    ItemPickedUp(CItemPickedUp),
    ItemPickupRejected(CItemPickupRejected),
    PlayerItemDropped(CPlayerItemDropped),
    PlayerDropConfirm(CPlayerDropConfirm),
    PartyMemberStats(CPartyMemberStats),
    PlayerPartyUpdated(CPlayerPartyUpdated),
    PartyGoldShare(CPartyGoldShare),
    PartyGoldShareResult(CPartyGoldShareResult),
    #[serde(rename = "remotePlayerVFX")]
    RemotePlayerVfx(CRemotePlayerVfx),
    RemoteProjectile(CRemoteProjectile),
    RemoteProjectileHit(CRemoteProjectileHit),
    #[serde(rename = "remoteSkillVFX")]
    RemoteSkillVfx(CRemoteSkillVfx),
    PlayerAppearanceUpdated(CPlayerAppearanceUpdated),
    PlayerDied(CPlayerDied),
    PlayerRespawned(CPlayerRespawned),
    GmAuthResult(CGmAuthResult),
    GmAuthStatus(CGmAuthStatus),
    LatencyPong(CLatencyPong),
    Error(CError),
    ChessMatched(CChessMatched),
    ChessOpponentMove(CChessOpponentMove),
    ChessOpponentResigned,
    ChessOpponentLeft,
    PqJoined(CPqJoined),
    PqStageAdvanced(CPqStageAdvanced),
}

impl ClientboundEvent {
    /// Serializes the full envelope. Fails only if a relayed opaque payload
    /// smuggled something non-serializable, which `serde_json::Value` rules
    /// out; the `Result` is still surfaced so call sites log instead of
    /// panicking.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(CError {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_join_without_optional_fields() {
        let ev = ServerboundEvent::decode(
            r#"{"event":"join","data":{"odId":"p1","name":"Mia","mapId":"henesys"}}"#,
        )
        .unwrap();
        match ev {
            ServerboundEvent::Join(join) => {
                assert_eq!(join.od_id.unwrap().as_str(), "p1");
                assert_eq!(join.name.as_deref(), Some("Mia"));
                assert_eq!(join.x, 0.0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_missing_and_null_data() {
        assert!(matches!(
            ServerboundEvent::decode(r#"{"event":"requestMonsters"}"#).unwrap(),
            ServerboundEvent::RequestMonsters
        ));
        assert!(matches!(
            ServerboundEvent::decode(r#"{"event":"latencyPing","data":null}"#).unwrap(),
            ServerboundEvent::LatencyPing(_)
        ));
    }

    #[test]
    fn rejects_unknown_event() {
        let err = ServerboundEvent::decode(r#"{"event":"becomeAdmin","data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEvent(name) if name == "becomeAdmin"));
    }

    #[test]
    fn adversarial_damage_stays_untyped() {
        let ev = ServerboundEvent::decode(
            r#"{"event":"attackMonster","data":{"monsterId":"m_1","damage":"9999999"}}"#,
        )
        .unwrap();
        match ev {
            ServerboundEvent::AttackMonster(attack) => assert!(attack.damage.is_string()),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn encodes_envelope_shape() {
        let frame = ClientboundEvent::PlayerLeft(CPlayerLeft { id: "p9".into() })
            .encode()
            .unwrap();
        assert_eq!(frame, r#"{"event":"playerLeft","data":{"id":"p9"}}"#);
    }

    #[test]
    fn vfx_event_names_keep_uppercase_suffix() {
        let frame = ClientboundEvent::RemoteSkillVfx(CRemoteSkillVfx::new(
            "p1".into(),
            Default::default(),
        ))
        .encode()
        .unwrap();
        assert!(frame.starts_with(r#"{"event":"remoteSkillVFX""#));
    }
}
