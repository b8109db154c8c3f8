//! A stateless pair-router: two waiting players get matched, then their
//! moves are relayed verbatim. The server knows nothing about chess rules.

use std::collections::HashMap;

use ember_protocol::client::{CChessMatched, CChessOpponentMove};
use ember_protocol::{ClientboundEvent, JsonMap};
use parking_lot::Mutex;
use rand::Rng;

use crate::net::{Connection, SessionId};

#[derive(Debug, Clone)]
struct Seat {
    conn: Connection,
    name: String,
}

#[derive(Default)]
struct LobbyInner {
    waiting: Option<Seat>,
    /// session -> the opponent's seat, one entry per side of every game.
    games: HashMap<SessionId, Seat>,
}

#[derive(Default)]
pub struct ChessLobby {
    inner: Mutex<LobbyInner>,
}

impl ChessLobby {
    /// Queue up; if somebody is already waiting, pair them immediately
    /// with randomly assigned colors.
    pub fn join_queue(&self, conn: &Connection, name: Option<String>) {
        let name = name.unwrap_or_else(|| "anonymous".to_owned());
        let mut inner = self.inner.lock();

        if inner
            .waiting
            .as_ref()
            .is_some_and(|seat| seat.conn.session == conn.session)
        {
            return;
        }

        let seat = Seat {
            conn: conn.clone(),
            name,
        };
        let Some(opponent) = inner.waiting.take() else {
            inner.waiting = Some(seat);
            return;
        };

        let (white, black) = if rand::thread_rng().gen_bool(0.5) {
            (&seat, &opponent)
        } else {
            (&opponent, &seat)
        };
        white
            .conn
            .send(&ClientboundEvent::ChessMatched(CChessMatched {
                color: "white",
                opponent_name: black.name.clone(),
            }));
        black
            .conn
            .send(&ClientboundEvent::ChessMatched(CChessMatched {
                color: "black",
                opponent_name: white.name.clone(),
            }));

        inner.games.insert(seat.conn.session, opponent.clone());
        inner.games.insert(opponent.conn.session, seat);
    }

    pub fn relay_move(&self, session: SessionId, payload: JsonMap) {
        let inner = self.inner.lock();
        if let Some(opponent) = inner.games.get(&session) {
            opponent
                .conn
                .send(&ClientboundEvent::ChessOpponentMove(CChessOpponentMove(
                    payload,
                )));
        }
    }

    pub fn resign(&self, session: SessionId) {
        let mut inner = self.inner.lock();
        if let Some(opponent) = inner.games.remove(&session) {
            inner.games.remove(&opponent.conn.session);
            opponent.conn.send(&ClientboundEvent::ChessOpponentResigned);
        }
    }

    /// Socket gone: drop from the queue and fold any running game.
    pub fn drop_session(&self, session: SessionId) {
        let mut inner = self.inner.lock();
        if inner
            .waiting
            .as_ref()
            .is_some_and(|seat| seat.conn.session == session)
        {
            inner.waiting = None;
        }
        if let Some(opponent) = inner.games.remove(&session) {
            inner.games.remove(&opponent.conn.session);
            opponent.conn.send(&ClientboundEvent::ChessOpponentLeft);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn event_of(rx: &mut UnboundedReceiver<String>) -> serde_json::Value {
        serde_json::from_str(&rx.try_recv().expect("expected frame")).unwrap()
    }

    #[test]
    fn pairing_assigns_both_colors() {
        let lobby = ChessLobby::default();
        let (a, mut a_rx) = Connection::test_pair();
        let (b, mut b_rx) = Connection::test_pair();

        lobby.join_queue(&a, Some("Ann".into()));
        assert!(a_rx.try_recv().is_err());
        lobby.join_queue(&b, Some("Bob".into()));

        let a_match = event_of(&mut a_rx);
        let b_match = event_of(&mut b_rx);
        assert_eq!(a_match["event"], "chessMatched");
        let colors = [
            a_match["data"]["color"].as_str().unwrap(),
            b_match["data"]["color"].as_str().unwrap(),
        ];
        assert!(colors.contains(&"white") && colors.contains(&"black"));
        assert_eq!(a_match["data"]["opponentName"], "Bob");
    }

    #[test]
    fn moves_relay_to_the_opponent_only() {
        let lobby = ChessLobby::default();
        let (a, mut a_rx) = Connection::test_pair();
        let (b, mut b_rx) = Connection::test_pair();
        lobby.join_queue(&a, None);
        lobby.join_queue(&b, None);
        let _ = a_rx.try_recv();
        let _ = b_rx.try_recv();

        let mv: JsonMap =
            serde_json::from_value(serde_json::json!({"from": "e2", "to": "e4"})).unwrap();
        lobby.relay_move(a.session, mv);
        let frame = event_of(&mut b_rx);
        assert_eq!(frame["event"], "chessOpponentMove");
        assert_eq!(frame["data"]["to"], "e4");
        assert!(a_rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_folds_the_game() {
        let lobby = ChessLobby::default();
        let (a, mut a_rx) = Connection::test_pair();
        let (b, mut b_rx) = Connection::test_pair();
        lobby.join_queue(&a, None);
        lobby.join_queue(&b, None);
        let _ = a_rx.try_recv();
        let _ = b_rx.try_recv();

        lobby.drop_session(a.session);
        assert_eq!(event_of(&mut b_rx)["event"], "chessOpponentLeft");
        // The survivor's session is free for a new game.
        lobby.join_queue(&b, None);
        assert!(b_rx.try_recv().is_err());
    }
}
