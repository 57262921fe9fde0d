//! WebSocket endpoint.
//!
//! A connection starts with no subscriptions. `login_user` joins the user's
//! notification room and `join_case` joins a case room; each subscription
//! forwards room broadcasts into the connection's outbound queue. Chat
//! messages are persisted, then fanned out to the case room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::rooms::Room;
use crate::state::AppState;
use crate::types::{CaseId, UserId};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Room broadcasts funnel through one outbound queue per connection.
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(100);
    let mut joined: HashSet<Room> = HashSet::new();

    tracing::info!("WebSocket connected");

    loop {
        tokio::select! {
            // Forwarded room broadcasts
            Some(msg) = out_rx.recv() => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        if let Some(reply) = dispatch(&state, &out_tx, &mut joined, &text).await {
                            if let Ok(json) = serde_json::to_string(&reply) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}

/// Act on one text frame: subscribe to a room or persist-and-fan-out a chat
/// message. Returns a reply destined for this connection alone, if any.
pub async fn dispatch(
    state: &Arc<AppState>,
    out_tx: &mpsc::Sender<ServerMessage>,
    joined: &mut HashSet<Room>,
    text: &str,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::LoginUser { user_id }) => {
            subscribe(state, out_tx, joined, Room::User(user_id)).await;
            None
        }
        Ok(ClientMessage::JoinCase { case_id }) => {
            subscribe(state, out_tx, joined, Room::Case(case_id)).await;
            None
        }
        Ok(ClientMessage::SendMessage {
            case_id,
            user_id,
            user,
            text,
        }) => handle_send_message(state, case_id, user_id, user, text).await,
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            })
        }
    }
}

/// Subscribe the connection to a room, spawning a forwarding task from the
/// room's broadcast channel into the connection queue. Re-joining a room the
/// connection is already in is a no-op.
async fn subscribe(
    state: &Arc<AppState>,
    out_tx: &mpsc::Sender<ServerMessage>,
    joined: &mut HashSet<Room>,
    room: Room,
) {
    if !joined.insert(room) {
        return;
    }
    tracing::debug!("Connection joined room {:?}", room);

    let mut rx = state.rooms.subscribe(room).await;
    let out_tx = out_tx.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    // Receiver gone means the connection closed.
                    if out_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                // Dropped messages are acceptable; delivery is best-effort.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Room {:?} subscriber lagged, skipped {}", room, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Persist a chat message and fan it out to the case room. Returns an error
/// reply for the sender if the write failed.
pub async fn handle_send_message(
    state: &Arc<AppState>,
    case_id: CaseId,
    user_id: UserId,
    user: String,
    text: String,
) -> Option<ServerMessage> {
    match state.db.add_message(case_id, user_id, &user, &text) {
        Ok(stored) => {
            state
                .rooms
                .publish(
                    Room::Case(case_id),
                    ServerMessage::NewMessage {
                        case_id,
                        user_id,
                        user,
                        text,
                        timestamp: stored.timestamp,
                    },
                )
                .await;
            None
        }
        Err(e) => {
            tracing::error!("Failed to store chat message: {e:#}");
            Some(ServerMessage::Error {
                code: "MESSAGE_FAILED".to_string(),
                msg: "Could not store message".to_string(),
            })
        }
    }
}
