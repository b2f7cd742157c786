//! A handle the session store can use to talk to an attached WebSocket,
//! without the store ever touching the socket directly.
//!
//! Per the single-writer rule (the relay interleaves `ready`, `error`,
//! `disconnect` and `dapp_reconnected` with forwarded frames), each
//! connection owns exactly one outbound mailbox; the task that split off the
//! socket's sink is the only task that ever writes to it.

use tokio::sync::mpsc;

/// Something queued for delivery to a single attached WebSocket.
#[derive(Debug, Clone)]
pub enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// A cloneable, cheap-to-hold reference to an attached WebSocket's outbound
/// mailbox. The session store keeps these; the actual socket task owns the
/// receiving end and the real `SplitSink`.
#[derive(Debug, Clone)]
pub struct Connection {
    id: String,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(id: String, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a text frame for delivery. Silently drops if the socket task
    /// has already gone away; the sweeper/unregister path will catch up.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.sender.send(Outbound::Text(text.into()));
    }

    /// Queue a close frame with the given close code and reason.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.sender.send(Outbound::Close {
            code,
            reason: reason.into(),
        });
    }
}
