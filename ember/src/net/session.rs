//! One `Session` per transport connection (WebSocket or long-poll
//! mailbox): decodes frames, tracks the identity the socket speaks for,
//! and routes every event to its handler.

use std::sync::Arc;

use ember_core::unix_millis;
use ember_protocol::client::{CGmAuthStatus, CLatencyPong, CServerStartTime};
use ember_protocol::{ClientboundEvent, ServerboundEvent};

use crate::net::Connection;
use crate::server::Server;
use crate::world::presence::{self, Identity};
use crate::world::{combat, elite, items, relay, simulator};

pub struct Session {
    server: Arc<Server>,
    pub conn: Connection,
    identity: Option<Identity>,
}

impl Session {
    pub fn new(server: Arc<Server>, conn: Connection) -> Self {
        Self {
            server,
            conn,
            identity: None,
        }
    }

    /// First thing every fresh connection hears; lets clients detect a
    /// restart and drop their stale prediction state.
    pub fn greet(&self) {
        self.conn
            .send(&ClientboundEvent::ServerStartTime(CServerStartTime {
                start_time: self.server.start_time,
            }));
    }

    pub async fn handle_frame(&mut self, frame: &str) {
        match ServerboundEvent::decode(frame) {
            Ok(event) => self.handle(event).await,
            Err(err) => {
                log::debug!("bad frame from {}: {err}", self.conn.session);
                self.conn.send(&ClientboundEvent::error(err.to_string()));
            }
        }
    }

    pub async fn handle(&mut self, event: ServerboundEvent) {
        log::trace!("{} -> {}", self.conn.session, event.name());
        match event {
            ServerboundEvent::Join(payload) => {
                match presence::join(&self.server, &self.conn, payload).await {
                    Ok(identity) => self.identity = Some(identity),
                    Err(err) => self.conn.send(&ClientboundEvent::error(err.to_string())),
                }
            }
            ServerboundEvent::Rejoin(payload) => {
                let previous = self.identity.take();
                match presence::rejoin(&self.server, &self.conn, previous, payload).await {
                    Ok(identity) => self.identity = Some(identity),
                    Err(err) => self.conn.send(&ClientboundEvent::error(err.to_string())),
                }
            }
            ServerboundEvent::ChangeMap(payload) => {
                if let Some(identity) = self.identity.take() {
                    self.identity =
                        Some(presence::change_map(&self.server, &self.conn, identity, payload).await);
                }
            }
            ServerboundEvent::UpdatePosition(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_moved(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::ChatMessage(payload) => {
                if let Some(identity) = &self.identity {
                    relay::chat_message(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::InitMapMonsters(payload) => {
                simulator::init_map_monsters(&self.server, &self.conn, payload).await;
            }
            ServerboundEvent::AttackMonster(payload) => {
                if let Some(identity) = &self.identity {
                    combat::attack_monster(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::TransformElite(payload) => {
                if let Some(identity) = &self.identity {
                    elite::transform_elite(&self.server, &self.conn, identity, payload).await;
                }
            }
            ServerboundEvent::ItemPickup(payload) => {
                if let Some(identity) = &self.identity {
                    items::item_pickup(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerDropItem(payload) => {
                if let Some(identity) = &self.identity {
                    items::player_drop_item(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::UpdateParty(payload) => {
                if let Some(identity) = &self.identity {
                    relay::update_party(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::UpdatePartyStats(payload) => {
                if let Some(identity) = &self.identity {
                    relay::update_party_stats(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::SharePartyGold(payload) => {
                if let Some(identity) = &self.identity {
                    items::share_party_gold(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerVfx(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_vfx(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerProjectile(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_projectile(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerProjectileHit(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_projectile_hit(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerSkillVfx(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_skill_vfx(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::UpdateAppearance(payload) => {
                if let Some(identity) = &self.identity {
                    relay::update_appearance(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerDeath(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_death(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::PlayerRespawn(payload) => {
                if let Some(identity) = &self.identity {
                    relay::player_respawn(&self.server, identity, payload).await;
                }
            }
            ServerboundEvent::RequestMonsters => {
                if let Some(identity) = &self.identity {
                    relay::request_monsters(&self.server, &self.conn, identity).await;
                }
            }
            ServerboundEvent::GmAuth(payload) => {
                let result = self
                    .server
                    .gm
                    .authenticate(self.conn.session, &payload.password);
                self.conn.send(&ClientboundEvent::GmAuthResult(result));
            }
            ServerboundEvent::CheckGmAuth => {
                self.conn
                    .send(&ClientboundEvent::GmAuthStatus(CGmAuthStatus {
                        is_gm: self.server.gm.is_gm(self.conn.session),
                    }));
            }
            ServerboundEvent::LatencyPing(payload) => {
                self.conn.send(&ClientboundEvent::LatencyPong(CLatencyPong {
                    t: payload.t,
                    server_time: unix_millis(),
                }));
            }
            ServerboundEvent::ChessJoinQueue(payload) => {
                self.server.chess.join_queue(&self.conn, payload.name);
            }
            ServerboundEvent::ChessMove(payload) => {
                self.server.chess.relay_move(self.conn.session, payload.0);
            }
            ServerboundEvent::ChessResign => {
                self.server.chess.resign(self.conn.session);
            }
            ServerboundEvent::PqJoin(payload) => {
                self.server.party_quest.join(payload.lobby_id, &self.conn);
            }
            ServerboundEvent::PqLeave(payload) => {
                self.server
                    .party_quest
                    .leave(&payload.lobby_id, self.conn.session);
            }
            ServerboundEvent::PqStageClear(payload) => {
                self.server
                    .party_quest
                    .stage_clear(&payload.lobby_id, self.conn.session);
            }
        }
    }

    /// Transport-level teardown; also what the poll sweeper calls on a
    /// stale mailbox.
    pub async fn disconnect(&mut self) {
        presence::disconnect(&self.server, &self.conn, self.identity.take()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testutil::{drain_events, next_frame};

    #[tokio::test]
    async fn frames_drive_the_full_join_attack_flow() {
        let server = Server::new();
        let (conn, mut rx) = Connection::test_pair();
        let mut session = Session::new(server.clone(), conn);
        session.greet();

        session
            .handle_frame(r#"{"event":"join","data":{"odId":"p1","name":"Mia","mapId":"henesys"}}"#)
            .await;
        session
            .handle_frame(
                r#"{"event":"initMapMonsters","data":{"mapId":"henesys","mapWidth":2000,"groundY":400,
                "spawnPositions":[{"type":"slime","x":500,"y":300,"surfaceX":300,"surfaceWidth":500}],
                "monsterTypes":{"slime":{"hp":30,"speed":1,"width":60,"height":50,
                "loot":[{"name":"Red Potion","rate":1.0}]}}}}"#,
            )
            .await;
        session
            .handle_frame(r#"{"event":"attackMonster","data":{"monsterId":"m_1","damage":40}}"#)
            .await;

        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            vec![
                "serverStartTime",
                "currentPlayers",
                "currentMonsters",
                "monsterSpawned",
                "currentMonsters",
                "monsterDamaged",
                "monsterKilled",
            ]
        );
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_get_private_errors() {
        let server = Server::new();
        let (conn, mut rx) = Connection::test_pair();
        let mut session = Session::new(server, conn);

        session.handle_frame("not json at all").await;
        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "error");

        session
            .handle_frame(r#"{"event":"becomeAdmin","data":{}}"#)
            .await;
        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "error");
        assert!(frame["data"]["message"]
            .as_str()
            .unwrap()
            .contains("becomeAdmin"));
    }

    #[tokio::test]
    async fn join_without_map_id_is_rejected_with_error() {
        let server = Server::new();
        let (conn, mut rx) = Connection::test_pair();
        let mut session = Session::new(server, conn);
        session
            .handle_frame(r#"{"event":"join","data":{"odId":"p1","name":"Mia"}}"#)
            .await;
        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "error");
    }

    #[tokio::test]
    async fn events_before_join_are_ignored() {
        let server = Server::new();
        let (conn, mut rx) = Connection::test_pair();
        let mut session = Session::new(server.clone(), conn);
        session
            .handle_frame(r#"{"event":"chatMessage","data":{"message":"hi"}}"#)
            .await;
        session
            .handle_frame(r#"{"event":"attackMonster","data":{"monsterId":"m_1","damage":40}}"#)
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn latency_ping_echoes() {
        let server = Server::new();
        let (conn, mut rx) = Connection::test_pair();
        let mut session = Session::new(server, conn);
        session
            .handle_frame(r#"{"event":"latencyPing","data":{"t":123.0}}"#)
            .await;
        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "latencyPong");
        assert_eq!(frame["data"]["t"], 123.0);
        assert!(frame["data"]["serverTime"].as_u64().is_some());
    }
}
