//! Long-polling fallback for clients that cannot hold a WebSocket. A
//! mailbox per session buffers outbound frames; `GET /poll/events` parks
//! until something arrives, `POST /poll/send` feeds the same dispatch the
//! WebSocket path uses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::net::http::AppState;
use crate::net::session::Session;
use crate::net::{Connection, SessionId};
use crate::server::Server;

/// How long an events poll parks before returning empty-handed.
const POLL_WAIT: Duration = Duration::from_secs(25);
/// A mailbox nobody polled for this long counts as a disconnect.
const POLL_STALE: Duration = Duration::from_secs(60);
const SWEEP_EVERY: Duration = Duration::from_secs(30);

struct Mailbox {
    session: tokio::sync::Mutex<Session>,
    frames: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    last_seen: parking_lot::Mutex<tokio::time::Instant>,
}

pub struct PollGateway {
    server: Arc<Server>,
    mailboxes: parking_lot::Mutex<HashMap<SessionId, Arc<Mailbox>>>,
}

impl PollGateway {
    pub fn new(server: Arc<Server>) -> Self {
        Self {
            server,
            mailboxes: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn connect(&self) -> SessionId {
        let (tx, rx) = mpsc::unbounded_channel();
        let sid = Uuid::new_v4();
        let conn = Connection::new(sid, tx);
        let session = Session::new(self.server.clone(), conn);
        session.greet();
        self.mailboxes.lock().insert(
            sid,
            Arc::new(Mailbox {
                session: tokio::sync::Mutex::new(session),
                frames: tokio::sync::Mutex::new(rx),
                last_seen: parking_lot::Mutex::new(tokio::time::Instant::now()),
            }),
        );
        log::debug!("poll session connected: {sid}");
        sid
    }

    fn mailbox(&self, sid: SessionId) -> Option<Arc<Mailbox>> {
        let mailbox = self.mailboxes.lock().get(&sid).cloned()?;
        *mailbox.last_seen.lock() = tokio::time::Instant::now();
        Some(mailbox)
    }

    /// Routes one envelope through the shared dispatch. False if the
    /// session does not exist (expired or never connected).
    pub async fn ingest(&self, sid: SessionId, frame: &str) -> bool {
        let Some(mailbox) = self.mailbox(sid) else {
            return false;
        };
        mailbox.session.lock().await.handle_frame(frame).await;
        true
    }

    /// Parks until at least one frame is buffered (or the poll window
    /// lapses), then drains everything queued.
    pub async fn collect(&self, sid: SessionId) -> Option<Vec<String>> {
        let mailbox = self.mailbox(sid)?;
        let mut rx = mailbox.frames.lock().await;
        let mut frames = Vec::new();
        if let Ok(Some(first)) = tokio::time::timeout(POLL_WAIT, rx.recv()).await {
            frames.push(first);
            while let Ok(frame) = rx.try_recv() {
                frames.push(frame);
            }
        }
        Some(frames)
    }

    /// Reaps mailboxes nobody polled recently, disconnecting their
    /// sessions exactly like a closed socket.
    pub async fn sweep(&self) {
        let stale: Vec<(SessionId, Arc<Mailbox>)> = {
            let mut mailboxes = self.mailboxes.lock();
            let expired: Vec<SessionId> = mailboxes
                .iter()
                .filter(|(_, m)| m.last_seen.lock().elapsed() > POLL_STALE)
                .map(|(sid, _)| *sid)
                .collect();
            expired
                .into_iter()
                .filter_map(|sid| mailboxes.remove(&sid).map(|m| (sid, m)))
                .collect()
        };
        for (sid, mailbox) in stale {
            log::info!("poll session expired: {sid}");
            mailbox.session.lock().await.disconnect().await;
        }
    }
}

pub async fn run_sweep(gateway: Arc<PollGateway>) {
    let mut ticker = tokio::time::interval(SWEEP_EVERY);
    loop {
        ticker.tick().await;
        gateway.sweep().await;
    }
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    sid: Uuid,
}

pub async fn connect(State(app): State<AppState>) -> Json<serde_json::Value> {
    let sid = app.poll.connect();
    Json(serde_json::json!({ "sid": sid }))
}

pub async fn send(
    State(app): State<AppState>,
    Query(query): Query<PollQuery>,
    body: String,
) -> StatusCode {
    if app.poll.ingest(query.sid, &body).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn events(State(app): State<AppState>, Query(query): Query<PollQuery>) -> Response {
    match app.poll.collect(query.sid).await {
        Some(frames) => {
            // Frames are already serialized envelopes; join them into a
            // JSON array without re-parsing.
            let body = format!("[{}]", frames.join(","));
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_queues_the_greeting() {
        let gateway = PollGateway::new(Server::new());
        let sid = gateway.connect();
        let frames = gateway.collect(sid).await.unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("serverStartTime"));
    }

    #[tokio::test]
    async fn ingest_feeds_the_same_dispatch_as_websockets() {
        let gateway = PollGateway::new(Server::new());
        let sid = gateway.connect();
        let ok = gateway
            .ingest(
                sid,
                r#"{"event":"join","data":{"odId":"p1","name":"Mia","mapId":"henesys"}}"#,
            )
            .await;
        assert!(ok);
        let frames = gateway.collect(sid).await.unwrap();
        let events: Vec<String> = frames
            .iter()
            .map(|f| {
                serde_json::from_str::<serde_json::Value>(f).unwrap()["event"]
                    .as_str()
                    .unwrap()
                    .to_owned()
            })
            .collect();
        assert_eq!(events, vec!["serverStartTime", "currentPlayers", "currentMonsters"]);
    }

    #[tokio::test]
    async fn unknown_session_is_refused() {
        let gateway = PollGateway::new(Server::new());
        assert!(!gateway.ingest(Uuid::new_v4(), "{}").await);
        assert!(gateway.collect(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_disconnects_stale_mailboxes() {
        let gateway = PollGateway::new(Server::new());
        let sid = gateway.connect();
        gateway
            .ingest(
                sid,
                r#"{"event":"join","data":{"odId":"p1","name":"Mia","mapId":"henesys"}}"#,
            )
            .await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        gateway.sweep().await;
        assert!(!gateway.ingest(sid, "{}").await);
        // The swept session left its room like any disconnect would.
        assert!(gateway.server.room(&"henesys".into()).await.is_none());
    }
}
