pub mod http;
pub mod keepalive;
pub mod poll;
pub mod rate_limit;
pub mod session;
pub mod ws;

use ember_protocol::ClientboundEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one transport session (a WebSocket or a long-poll mailbox).
/// GM membership and the side surfaces key on this, not on `odId`, so a
/// character switch keeps them.
pub type SessionId = Uuid;

/// Cheap handle for pushing frames at one client. The writer half of the
/// transport drains the channel; a dropped receiver just makes `send` a
/// no-op, which is exactly what a vanished peer should be.
#[derive(Debug, Clone)]
pub struct Connection {
    pub session: SessionId,
    tx: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { session, tx }
    }

    pub fn send(&self, event: &ClientboundEvent) {
        match event.encode() {
            Ok(frame) => self.send_frame(frame),
            Err(err) => log::error!("dropping unencodable event: {err}"),
        }
    }

    /// Fan-out path: the caller serialized once and clones the frame.
    pub fn send_frame(&self, frame: String) {
        let _ = self.tx.send(frame);
    }

    #[cfg(test)]
    pub fn test() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self::new(Uuid::new_v4(), tx)
    }

    /// Test handle that keeps the receiving end so assertions can drain
    /// what the server sent.
    #[cfg(test)]
    pub fn test_pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(Uuid::new_v4(), tx), rx)
    }
}
