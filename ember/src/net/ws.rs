//! WebSocket framing: one task per socket reading frames into the shared
//! session dispatch, one writer task draining the outbound channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::net::http::AppState;
use crate::net::session::Session;
use crate::net::Connection;
use crate::server::Server;

pub async fn upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(app.server, socket))
}

async fn handle_socket(server: Arc<Server>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let conn = Connection::new(Uuid::new_v4(), tx);
    log::debug!("ws connected: {}", conn.session);
    let mut session = Session::new(server, conn);
    session.greet();

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => session.handle_frame(&text).await,
            Ok(Message::Close(_)) | Err(_) => break,
            // Pings are answered by the transport; binary has no meaning
            // on this wire.
            Ok(_) => {}
        }
    }

    log::debug!("ws closed: {}", session.conn.session);
    session.disconnect().await;
    writer.abort();
}
