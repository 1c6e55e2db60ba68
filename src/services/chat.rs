//! Chat relay — 1:1 messages, typing indicators and read receipts.
//!
//! DESIGN
//! ======
//! Chat is relayed, never stored. A message is forwarded to the recipient's
//! live connection and the sender gets `message_delivered` only when the
//! forward succeeded. Offline recipients simply miss the message.
//!
//! Typing indicators are tracked per `(sender, recipient)` pair. A
//! background sweeper wakes every second and emits a synthetic
//! `typing_stop` for indicators that outlived the typing timeout. The same
//! sweep also prunes idle rate-limit windows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::frame::{
    ErrorCode, Frame, TYPE_CHAT_MESSAGE, TYPE_MESSAGE_DELIVERED, TYPE_MESSAGE_READ, TYPE_TYPING_START,
    TYPE_TYPING_STOP,
};
use crate::rate_limit::RateLimitError;
use crate::state::AppState;
use crate::store::{StoreError, UserId};

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("to_user_id is required")]
    MissingRecipient,
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Message too long (max {max} characters)")]
    MessageTooLong { max: usize },
    #[error("You can only chat with friends")]
    NotFriends(UserId),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("chat unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRecipient => "E_MISSING_RECIPIENT",
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::MessageTooLong { .. } => "E_MESSAGE_TOO_LONG",
            Self::NotFriends(_) => "E_NOT_FRIENDS",
            Self::RateLimited(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::RateLimited(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

fn recipient(req: &Frame) -> Result<UserId, ChatError> {
    req.i64_field("to_user_id").ok_or(ChatError::MissingRecipient)
}

async fn require_friend(state: &AppState, from: UserId, to: UserId) -> Result<(), ChatError> {
    if from != to && state.directory.are_friends(from, to).await? {
        Ok(())
    } else {
        Err(ChatError::NotFriends(to))
    }
}

/// Relay a `chat_message`. Returns the `message_delivered` confirmation for
/// the sender when the recipient's connection accepted the frame.
///
/// # Errors
///
/// Validation, rate-limit and friendship failures; the sender receives them
/// as a `chat_error` frame.
pub async fn relay_message(state: &AppState, from: UserId, req: &Frame) -> Result<Option<Frame>, ChatError> {
    let to = recipient(req)?;
    let text = req.str_field("message").unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let max = state.config.chat.max_len;
    if text.chars().count() > max {
        return Err(ChatError::MessageTooLong { max });
    }

    state.rate_limiter.check_and_record(from)?;
    require_friend(state, from, to).await?;

    let from_nickname = match state.directory.user_by_id(from).await? {
        Some(user) => user.display_name().to_owned(),
        None => from.to_string(),
    };
    let message_id = req.str_field("message_id").map(str::to_owned);

    let mut forward = Frame::new(TYPE_CHAT_MESSAGE)
        .with_data("from_user_id", from)
        .with_data("from_nickname", from_nickname)
        .with_data("message", text)
        .with_timestamp();
    if let Some(id) = &message_id {
        forward = forward.with_data("message_id", id.as_str());
    }

    // A real message ends any pending typing indicator for this pair.
    state.typing.stop(from, to);

    if !state.registry.send_to_user(to, forward) {
        tracing::debug!(from, to, "chat: recipient offline, message dropped");
        return Ok(None);
    }

    let mut delivered = Frame::new(TYPE_MESSAGE_DELIVERED)
        .with_data("to_user_id", to)
        .with_timestamp();
    if let Some(id) = message_id {
        delivered = delivered.with_data("message_id", id);
    }
    Ok(Some(delivered))
}

/// Relay `typing_start` / `typing_stop` and track the indicator.
///
/// # Errors
///
/// Missing recipient or recipient not a friend.
pub async fn relay_typing(state: &AppState, from: UserId, req: &Frame, started: bool) -> Result<(), ChatError> {
    let to = recipient(req)?;
    require_friend(state, from, to).await?;

    let kind = if started {
        state.typing.start(from, to);
        TYPE_TYPING_START
    } else {
        state.typing.stop(from, to);
        TYPE_TYPING_STOP
    };
    state
        .registry
        .send_to_user(to, Frame::new(kind).with_data("from_user_id", from));
    Ok(())
}

/// Forward a `read_receipt` to the original sender as `message_read`.
///
/// # Errors
///
/// Missing recipient.
pub fn relay_read_receipt(state: &AppState, reader: UserId, req: &Frame) -> Result<(), ChatError> {
    let original_sender = recipient(req)?;
    let mut frame = Frame::new(TYPE_MESSAGE_READ)
        .with_data("from_user_id", reader)
        .with_timestamp();
    if let Some(id) = req.str_field("message_id") {
        frame = frame.with_data("message_id", id);
    }
    state.registry.send_to_user(original_sender, frame);
    Ok(())
}

// =============================================================================
// TYPING TRACKER
// =============================================================================

/// Last `typing_start` per `(sender, recipient)` pair.
#[derive(Clone)]
pub struct TypingTracker {
    inner: Arc<Mutex<HashMap<(UserId, UserId), Instant>>>,
    timeout: Duration,
}

impl TypingTracker {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), timeout }
    }

    pub fn start(&self, from: UserId, to: UserId) {
        self.start_at(from, to, Instant::now());
    }

    fn start_at(&self, from: UserId, to: UserId, now: Instant) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((from, to), now);
    }

    /// Returns whether an indicator was active.
    pub fn stop(&self, from: UserId, to: UserId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(from, to))
            .is_some()
    }

    /// Remove and return every pair whose indicator is older than the timeout.
    pub fn expire(&self) -> Vec<(UserId, UserId)> {
        self.expire_at(Instant::now())
    }

    fn expire_at(&self, now: Instant) -> Vec<(UserId, UserId)> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut expired: Vec<(UserId, UserId)> = inner
            .iter()
            .filter(|(_, started)| now.duration_since(**started) >= self.timeout)
            .map(|(pair, _)| *pair)
            .collect();
        for pair in &expired {
            inner.remove(pair);
        }
        expired.sort_unstable();
        expired
    }

    /// Remove every indicator involving `user_id`, e.g. on disconnect.
    /// Returns the pairs where `user_id` was the typist.
    pub fn clear_user(&self, user_id: UserId) -> Vec<(UserId, UserId)> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut typed: Vec<(UserId, UserId)> = inner.keys().filter(|(from, _)| *from == user_id).copied().collect();
        inner.retain(|(from, to), _| *from != user_id && *to != user_id);
        typed.sort_unstable();
        typed
    }
}

/// Emit a synthetic `typing_stop` for each expired pair.
pub fn emit_typing_stops(state: &AppState, pairs: &[(UserId, UserId)]) {
    for &(from, to) in pairs {
        state.registry.send_to_user(
            to,
            Frame::new(TYPE_TYPING_STOP)
                .with_data("from_user_id", from)
                .with_data("expired", true),
        );
    }
}

/// Spawn the typing / rate-limit sweeper. Returns a handle for shutdown.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = state.typing.expire();
            if !expired.is_empty() {
                tracing::debug!(count = expired.len(), "chat: expiring typing indicators");
                emit_typing_stops(&state, &expired);
            }
            state.rate_limiter.sweep();
        }
    })
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
