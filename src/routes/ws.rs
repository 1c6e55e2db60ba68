//! WebSocket handler — device connection lifecycle and frame routing.
//!
//! DESIGN
//! ======
//! On upgrade the connection registers an unbound outbound channel with the
//! registry and enters a `select!` loop:
//! - Incoming device frames → parse + dispatch by `type`; replies for the
//!   sender are written directly.
//! - Outbound channel → frames pushed by other connections (presence, chat,
//!   game events) and the eviction signal.
//! - Heartbeat tick → WebSocket ping; too many silent intervals closes.
//!
//! Handlers return the frames meant for the sender. Everything addressed to
//! other users goes through fanout and the registry.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection registered, unbound
//! 2. `init` / `login` → bind, presence both ways, ack
//! 3. Other frames → routed for the bound user
//! 4. Close, error, eviction or heartbeat timeout → unbind, clear typing,
//!    broadcast offline unless a newer connection holds the user

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{
    ErrorCode, Frame, TYPE_CHAT_ERROR, TYPE_CHAT_MESSAGE, TYPE_EVICTED, TYPE_GAME_ACTION, TYPE_GAME_RESPONSE,
    TYPE_INIT, TYPE_INIT_ACK, TYPE_LOGIN, TYPE_LOGIN_SUCCESS, TYPE_PING, TYPE_PONG, TYPE_READ_RECEIPT,
    TYPE_TYPING_START, TYPE_TYPING_STOP, TYPE_USERNAME_VALID, TYPE_VALIDATE_USERNAME,
};
use crate::services::auth::{self, AuthError};
use crate::services::registry::{Outbound, RegistryError};
use crate::services::{chat, game, presence};
use crate::state::AppState;
use crate::store::{StoreError, User, UserId};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("Not initialized: send init or login first")]
    NotInitialized,
    #[error("user_id is required")]
    MissingUserId,
    #[error("Unknown message type: {0}")]
    UnknownType(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("presence unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for WsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "E_NOT_INITIALIZED",
            Self::MissingUserId => "E_MISSING_USER_ID",
            Self::UnknownType(_) => "E_UNKNOWN_TYPE",
            Self::Auth(e) => e.error_code(),
            Self::Registry(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Auth(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.config.ws_channel_capacity);
    let client_id = state.registry.connect(tx);
    info!(%client_id, "ws: client connected");

    let heartbeat = state.config.heartbeat;
    let mut ticker = tokio::time::interval(heartbeat.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;
    let mut silent_intervals: u32 = 0;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                silent_intervals = 0;
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, client_id, text.as_str()).await;
                        if send_all(&mut socket, &replies).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            out = rx.recv() => {
                match out {
                    Some(Outbound::Frame(frame)) => {
                        if send_frame(&mut socket, &frame).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Evicted) => {
                        info!(%client_id, "ws: evicted by newer connection");
                        let notice = Frame::new(TYPE_EVICTED).with_data("message", "Signed in from another connection");
                        let _ = send_frame(&mut socket, &notice).await;
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                silent_intervals += 1;
                if silent_intervals >= heartbeat.max_missed {
                    warn!(%client_id, silent_intervals, "ws: heartbeat timeout, closing");
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

/// Drop the connection's binding and tell friends, unless the user already
/// holds a newer connection.
async fn disconnect(state: &AppState, client_id: Uuid) {
    let Some(user_id) = state.registry.unbind_and_disconnect(client_id) else {
        return;
    };
    let stopped = state.typing.clear_user(user_id);
    chat::emit_typing_stops(state, &stopped);
    if !state.registry.is_online(user_id) {
        presence::on_unbind(state, user_id).await;
    }
}

async fn send_all(socket: &mut WebSocket, frames: &[Frame]) -> Result<(), ()> {
    for frame in frames {
        send_frame(socket, frame).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let text = match frame.to_text() {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if let Some(code) = frame.str_field("code") {
        debug!(kind = %frame.kind, code, "ws: send error frame");
    } else {
        debug!(kind = %frame.kind, "ws: send frame");
    }
    socket.send(Message::Text(text.into())).await.map_err(|e| {
        debug!(error = %e, "ws: send failed");
    })
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Kept separate from the socket so tests can drive routing with nothing
/// more than a registry channel.
pub(crate) async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str) -> Vec<Frame> {
    let req = match Frame::parse(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![Frame::error_from(&e)];
        }
    };
    debug!(%client_id, kind = %req.kind, "ws: recv frame");

    match req.kind.as_str() {
        TYPE_PING => vec![Frame::new(TYPE_PONG).with_timestamp()],
        TYPE_INIT => handle_init(state, client_id, &req).await,
        TYPE_LOGIN => handle_login(state, client_id, &req).await,
        TYPE_VALIDATE_USERNAME => {
            let username = req.str_field("username").unwrap_or_default();
            match auth::lookup_username(state, username).await {
                Ok(_) => vec![Frame::new(TYPE_USERNAME_VALID).with_data("message", "Username exists")],
                Err(e) => vec![Frame::error_from(&e)],
            }
        }
        _ => match state.registry.user_for_client(client_id) {
            Some(user_id) => handle_bound(state, user_id, &req).await,
            None => vec![Frame::error_from(&WsError::NotInitialized)],
        },
    }
}

/// Bind `user` to the connection and run presence in both directions.
/// Returns the user's online friends.
async fn bind_user(state: &AppState, client_id: Uuid, user: &User) -> Result<Vec<UserId>, WsError> {
    let outcome = state.registry.bind(client_id, user.id)?;
    if let Some(evicted) = outcome.evicted_client {
        info!(%client_id, %evicted, user_id = user.id, "ws: replaced older connection");
    }
    if let Some(previous) = outcome.previous_user
        && !state.registry.is_online(previous)
    {
        presence::on_unbind(state, previous).await;
    }
    info!(%client_id, user_id = user.id, "ws: client bound");
    Ok(presence::on_bind(state, user.id).await?)
}

fn bound_frame(kind: &str, client_id: Uuid, user: &User, online_friends: Vec<UserId>) -> Frame {
    Frame::new(kind)
        .with_data("user_id", user.id)
        .with_data("username", user.username.as_str())
        .with_data("nickname", user.display_name())
        .with_data("session_id", client_id.to_string())
        .with_data("online_friends", online_friends)
        .with_timestamp()
}

async fn handle_init(state: &AppState, client_id: Uuid, req: &Frame) -> Vec<Frame> {
    let result = async {
        let user_id = req.i64_field("user_id").ok_or(WsError::MissingUserId)?;
        let user = auth::lookup_user_id(state, user_id).await?;
        let online = bind_user(state, client_id, &user).await?;
        Ok::<_, WsError>(bound_frame(TYPE_INIT_ACK, client_id, &user, online))
    }
    .await;
    vec![result.unwrap_or_else(|e| Frame::error_from(&e))]
}

async fn handle_login(state: &AppState, client_id: Uuid, req: &Frame) -> Vec<Frame> {
    let result = async {
        let username = req.str_field("username").unwrap_or_default();
        let pin = req.str_field("pin").unwrap_or_default();
        let user = auth::verify_credentials(state, username, pin).await?;
        let online = bind_user(state, client_id, &user).await?;
        Ok::<_, WsError>(
            bound_frame(TYPE_LOGIN_SUCCESS, client_id, &user, online).with_data("message", "Authentication successful"),
        )
    }
    .await;
    vec![result.unwrap_or_else(|e| Frame::error_from(&e))]
}

async fn handle_bound(state: &AppState, user_id: UserId, req: &Frame) -> Vec<Frame> {
    match req.kind.as_str() {
        TYPE_CHAT_MESSAGE => match chat::relay_message(state, user_id, req).await {
            Ok(confirmation) => confirmation.into_iter().collect(),
            Err(e) => vec![Frame::error_as(TYPE_CHAT_ERROR, &e)],
        },
        TYPE_TYPING_START | TYPE_TYPING_STOP => {
            let started = req.kind == TYPE_TYPING_START;
            match chat::relay_typing(state, user_id, req, started).await {
                Ok(()) => vec![],
                Err(e) => vec![Frame::error_as(TYPE_CHAT_ERROR, &e)],
            }
        }
        TYPE_READ_RECEIPT => match chat::relay_read_receipt(state, user_id, req) {
            Ok(()) => vec![],
            Err(e) => vec![Frame::error_as(TYPE_CHAT_ERROR, &e)],
        },
        TYPE_GAME_ACTION => {
            let action = req.str_field("action").unwrap_or_default().to_owned();
            let reply = match game::dispatch_action(state, user_id, req).await {
                Ok(data) => Frame::new(TYPE_GAME_RESPONSE)
                    .with_data("success", true)
                    .with_data("data", data),
                Err(e) => {
                    debug!(user_id, action = %action, error = %e, "ws: game action rejected");
                    Frame::error_as(TYPE_GAME_RESPONSE, &e).with_data("success", false)
                }
            };
            vec![reply.with_data("action", action)]
        }
        other => vec![Frame::error_from(&WsError::UnknownType(other.to_owned()))],
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
