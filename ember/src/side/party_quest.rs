//! Party-quest stage relay: a thin pub/sub over a fixed stage table.
//! Lobby members hear every advance; the server validates nothing beyond
//! table bounds.

use std::collections::HashMap;

use ember_protocol::client::{CPqJoined, CPqStageAdvanced};
use ember_protocol::ClientboundEvent;
use parking_lot::Mutex;

use crate::net::{Connection, SessionId};

/// The fixed progression; `pqStageClear` walks it left to right and stops
/// at the end.
pub const PQ_STAGES: [&str; 6] = [
    "pq_lobby",
    "pq_stage1",
    "pq_stage2",
    "pq_stage3",
    "pq_bonus",
    "pq_exit",
];

#[derive(Default)]
struct PqLobby {
    stage: usize,
    members: HashMap<SessionId, Connection>,
}

#[derive(Default)]
pub struct PartyQuestRelay {
    lobbies: Mutex<HashMap<String, PqLobby>>,
}

impl PartyQuestRelay {
    pub fn join(&self, lobby_id: String, conn: &Connection) {
        let mut lobbies = self.lobbies.lock();
        let lobby = lobbies.entry(lobby_id.clone()).or_default();
        lobby.members.insert(conn.session, conn.clone());
        conn.send(&ClientboundEvent::PqJoined(CPqJoined {
            lobby_id,
            stage: PQ_STAGES[lobby.stage],
            stage_index: lobby.stage,
            member_count: lobby.members.len(),
        }));
    }

    pub fn leave(&self, lobby_id: &str, session: SessionId) {
        let mut lobbies = self.lobbies.lock();
        if let Some(lobby) = lobbies.get_mut(lobby_id) {
            lobby.members.remove(&session);
            if lobby.members.is_empty() {
                lobbies.remove(lobby_id);
            }
        }
    }

    /// Advances the lobby one stage and tells every member. Clears past
    /// the final stage are ignored.
    pub fn stage_clear(&self, lobby_id: &str, session: SessionId) {
        let mut lobbies = self.lobbies.lock();
        let Some(lobby) = lobbies.get_mut(lobby_id) else {
            return;
        };
        if !lobby.members.contains_key(&session) {
            return;
        }
        if lobby.stage + 1 >= PQ_STAGES.len() {
            return;
        }
        lobby.stage += 1;
        let advanced = ClientboundEvent::PqStageAdvanced(CPqStageAdvanced {
            lobby_id: lobby_id.to_owned(),
            stage: PQ_STAGES[lobby.stage],
            stage_index: lobby.stage,
        });
        for member in lobby.members.values() {
            member.send(&advanced);
        }
    }

    pub fn drop_session(&self, session: SessionId) {
        let mut lobbies = self.lobbies.lock();
        lobbies.retain(|_, lobby| {
            lobby.members.remove(&session);
            !lobby.members.is_empty()
        });
    }
}
