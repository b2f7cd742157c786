//! In-memory session store: the relay's single source of truth for which
//! DApp and Mobile are paired, and whether a Mobile lock is held.

pub mod connection;

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use connection::Connection;

const PENDING_TTL_MS: i64 = 5 * 60 * 1000;
const CONNECTED_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dapp,
    Mobile,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::Dapp => Role::Mobile,
            Role::Mobile => Role::Dapp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Connected,
    Disconnected,
}

/// Opaque, advisory metadata supplied by the creating DApp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A single session record.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub secret: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
    pub status: SessionStatus,
    pub dapp: Option<Connection>,
    pub mobile: Option<Connection>,
    pub mobile_locked: bool,
    pub metadata: Option<SessionMetadata>,
    pub terminated: bool,
}

impl Session {
    fn slot(&self, role: Role) -> &Option<Connection> {
        match role {
            Role::Dapp => &self.dapp,
            Role::Mobile => &self.mobile,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<Connection> {
        match role {
            Role::Dapp => &mut self.dapp,
            Role::Mobile => &mut self.mobile,
        }
    }
}

/// Outcome of a successful `register_connection` call.
pub struct RegisterOutcome {
    pub session: Session,
    /// Whether the opposite-role peer was already attached before this call.
    pub peer_already_attached: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_sessions: usize,
    pub pending_sessions: usize,
    pub connected_sessions: usize,
    pub max_sessions: usize,
    pub uptime: u64,
}

/// Process-wide in-memory session map.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_sessions: usize,
    started_at: Instant,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            started_at: Instant::now(),
        }
    }

    pub async fn is_at_capacity(&self) -> bool {
        self.sessions.read().await.len() >= self.max_sessions
    }

    /// Create a new pending session. Returns `None` if capacity is reached,
    /// checked atomically with the insert.
    pub async fn create(&self, metadata: Option<SessionMetadata>) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return None;
        }

        let id = crate::ids::generate_unique_id(|candidate| sessions.contains_key(candidate));
        let secret = crate::ids::generate_secret();
        let now = now_ms();

        let session = Session {
            id: id.clone(),
            secret,
            created_at_ms: now,
            expires_at_ms: now + PENDING_TTL_MS,
            status: SessionStatus::Pending,
            dapp: None,
            mobile: None,
            mobile_locked: false,
            metadata,
            terminated: false,
        };

        sessions.insert(id, session.clone());
        Some(session)
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session without closing its connections.
    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn verify_secret(&self, id: &str, secret: &str) -> bool {
        match self.sessions.read().await.get(id) {
            Some(session) => constant_time_eq(session.secret.as_bytes(), secret.as_bytes()),
            None => false,
        }
    }

    pub async fn is_mobile_locked(&self, id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.mobile_locked)
            .unwrap_or(false)
    }

    /// Attempt to attach `conn` to `id` under `role`. Returns `None` if the
    /// session is unknown, terminated, or (for `role == Mobile`) already
    /// locked by another Mobile.
    pub async fn register_connection(
        &self,
        id: &str,
        role: Role,
        conn: Connection,
    ) -> Option<RegisterOutcome> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;

        if session.terminated {
            return None;
        }

        if role == Role::Mobile && session.mobile_locked && session.mobile.is_some() {
            return None;
        }

        let peer_already_attached = session.slot(role.other()).is_some();

        *session.slot_mut(role) = Some(conn);
        if role == Role::Mobile {
            session.mobile_locked = true;
        }

        if session.dapp.is_some() && session.mobile.is_some() {
            session.status = SessionStatus::Connected;
            session.expires_at_ms = now_ms() + CONNECTED_TTL_MS;
        }

        Some(RegisterOutcome {
            session: session.clone(),
            peer_already_attached,
        })
    }

    /// Detach whichever connection is attached under `role`, if it is still
    /// `conn_id`. A stale connection (superseded by a reconnect) that notices
    /// its own closure late must not clear the slot a newer connection now
    /// occupies. Returns whether `conn_id` was actually the live occupant and
    /// got detached; callers use this to decide whether a peer notification
    /// is warranted. No-op (and `false`) if the session is unknown or the
    /// slot holds a different connection.
    pub async fn unregister_connection(&self, id: &str, role: Role, conn_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };

        if session.slot(role).as_ref().map(Connection::id) != Some(conn_id) {
            return false;
        }

        *session.slot_mut(role) = None;
        if role == Role::Mobile {
            session.mobile_locked = false;
        }
        session.status = SessionStatus::Disconnected;
        true
    }

    /// Mark a session terminated and close both attached connections.
    pub async fn terminate_session(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(id) {
            session.terminated = true;
            session.status = SessionStatus::Disconnected;
            close_both(session, 1008, "Session terminated");
        }
    }

    pub async fn get_peer(&self, id: &str, my_role: Role) -> Option<Connection> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.slot(my_role.other()).clone())
    }

    /// Returns the attachment under `role` itself, as opposed to `get_peer`'s
    /// opposite-role lookup. Used by the WS handler to message its own socket.
    pub async fn get_connection(&self, id: &str, role: Role) -> Option<Connection> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.slot(role).clone())
    }

    /// Remove all sessions past their `expires_at`, closing any attached
    /// connections with a normal-closure code and reason.
    pub async fn cleanup_expired(&self) -> usize {
        let now = now_ms();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now > s.expires_at_ms)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = sessions.get(id) {
                close_both(session, 1000, "Session expired");
            }
            sessions.remove(id);
        }

        expired.len()
    }

    /// Close every currently attached connection, used at process shutdown.
    /// Leaves the records in place; the process is exiting regardless.
    pub async fn close_all(&self, code: u16, reason: &str) {
        let sessions = self.sessions.read().await;
        for session in sessions.values() {
            close_both(session, code, reason);
        }
    }

    pub async fn stats(&self) -> Stats {
        let sessions = self.sessions.read().await;
        let pending = sessions
            .values()
            .filter(|s| s.status == SessionStatus::Pending)
            .count();
        let connected = sessions
            .values()
            .filter(|s| s.status == SessionStatus::Connected)
            .count();

        Stats {
            total_sessions: sessions.len(),
            pending_sessions: pending,
            connected_sessions: connected,
            max_sessions: self.max_sessions,
            uptime: self.started_at.elapsed().as_secs(),
        }
    }
}

fn close_both(session: &Session, code: u16, reason: &str) {
    if let Some(dapp) = &session.dapp {
        dapp.close(code, reason);
    }
    if let Some(mobile) = &session.mobile {
        mobile.close(code, reason);
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Constant-time comparison so secret verification doesn't leak timing
/// information through early-exit byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
