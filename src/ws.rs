//! WebSocket surface: per-connection handshake, registration, and verbatim
//! frame forwarding between the two role slots of a session.

use axum::{
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::connection::{Connection, Outbound};
use crate::session::Role;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    session: Option<String>,
    role: Option<String>,
    k: Option<String>,
}

async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let (session_id, role_str) = match (query.session, query.role) {
        (Some(s), Some(r)) => (s, r),
        _ => return (StatusCode::BAD_REQUEST, "missing session or role").into_response(),
    };

    let role = match role_str.as_str() {
        "dapp" => Role::Dapp,
        "mobile" => Role::Mobile,
        _ => return (StatusCode::BAD_REQUEST, "role must be dapp or mobile").into_response(),
    };

    let session = match state.sessions.get(&session_id).await {
        Some(s) => s,
        None => return (StatusCode::NOT_FOUND, "session not found").into_response(),
    };

    if role == Role::Mobile {
        let secret_ok = match &query.k {
            Some(k) => state.sessions.verify_secret(&session_id, k).await,
            None => false,
        };
        if !secret_ok {
            return (StatusCode::FORBIDDEN, "invalid secret").into_response();
        }
        if session.mobile_locked {
            return (StatusCode::CONFLICT, "mobile already attached").into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id, role))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String, role: Role) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let conn_id = uuid::Uuid::new_v4().to_string();
    let conn = Connection::new(conn_id.clone(), tx);

    let outcome = match state
        .sessions
        .register_connection(&session_id, role, conn)
        .await
    {
        Some(outcome) => outcome,
        None => {
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: 1008,
                    reason: "Session not found or already locked".into(),
                })))
                .await;
            return;
        }
    };

    tracing::info!(session = %session_id, role = ?role, "peer attached");

    // The single writer task: everything bound for this socket, whether a
    // relay notification or a forwarded frame, goes through `rx`.
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let result = match msg {
                Outbound::Text(text) => sink.send(Message::Text(text)).await,
                Outbound::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            };
            if result.is_err() {
                break;
            }
        }
    });

    send_ready(&state, &session_id, role).await;

    if role == Role::Dapp && outcome.peer_already_attached {
        if let Some(mobile) = state.sessions.get_peer(&session_id, Role::Dapp).await {
            mobile.send_text(r#"{"type":"dapp_reconnected"}"#);
        }
    }

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => forward(&state, &session_id, role, text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
            _ = &mut writer => break,
        }
    }

    let detached = state
        .sessions
        .unregister_connection(&session_id, role, &conn_id)
        .await;
    tracing::info!(session = %session_id, role = ?role, detached, "peer connection closed");

    // If a newer connection already replaced this one (a reconnect), it is
    // still attached and must not be told its peer disconnected.
    if detached {
        if let Some(peer) = state.sessions.get_peer(&session_id, role).await {
            peer.send_text(r#"{"type":"disconnect","reason":"Peer disconnected"}"#);
        }
    }

    writer.abort();
}

async fn send_ready(state: &AppState, session_id: &str, role: Role) {
    if let Some(me) = state.sessions.get_connection(session_id, role).await {
        me.send_text(r#"{"type":"ready"}"#);
    }
}

async fn forward(state: &AppState, session_id: &str, role: Role, text: String) {
    match state.sessions.get_peer(session_id, role).await {
        Some(peer) => peer.send_text(text),
        None => {
            if let Some(me) = state.sessions.get_connection(session_id, role).await {
                me.send_text(r#"{"type":"error","code":-32000,"message":"Peer not connected"}"#);
            }
        }
    }
}
