//! Friend graph — requests, acceptance, removal and listing.
//!
//! LIFECYCLE
//! =========
//! A request row is unique per `(from, to)` pair and moves
//! `pending -> accepted | rejected`. Sending again after a rejection (or
//! after the friendship was removed) revives the same row to `pending`.
//! A cancelled request is deleted outright.
//!
//! The recipient's `friend_request` notification is created or refreshed
//! alongside the request and pushed live when the recipient is online.

use serde::Serialize;

use super::fanout;
use crate::frame::ErrorCode;
use crate::state::AppState;
use crate::store::{
    FriendRequest, FriendRequestId, FriendRequestStatus, NotificationId, StoreError, UserId,
    NOTIFICATION_FRIEND_REQUEST, NOTIFICATION_FRIEND_REQUEST_ACCEPTED, NOTIFICATION_FRIEND_REQUEST_CANCELLED,
};

#[derive(Debug, thiserror::Error)]
pub enum FriendError {
    #[error("Cannot send a friend request to yourself")]
    SelfRequest,
    #[error("User {0} not found")]
    UserNotFound(UserId),
    #[error("Users are already friends")]
    AlreadyFriends,
    #[error("User already sent you a friend request (request {0})")]
    IncomingPending(FriendRequestId),
    #[error("Notification {0} not found or does not belong to user")]
    NotificationNotFound(NotificationId),
    #[error("Notification {0} is not a friend request")]
    NotFriendRequest(NotificationId),
    #[error("Friend request {0} not found")]
    RequestNotFound(FriendRequestId),
    #[error("Only the recipient can answer a friend request")]
    NotRecipient,
    #[error("Friend request {id} is already {status}")]
    NotPending { id: FriendRequestId, status: &'static str },
    #[error("No pending friend request found from user {from} to user {to}")]
    NoPendingRequest { from: UserId, to: UserId },
    #[error("Friendship between user {user} and user {friend} not found")]
    FriendshipNotFound { user: UserId, friend: UserId },
    #[error("Friend request changed concurrently, retry")]
    Conflict,
    #[error("friend store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for FriendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SelfRequest => "E_SELF_REQUEST",
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::AlreadyFriends => "E_ALREADY_FRIENDS",
            Self::IncomingPending(_) => "E_INCOMING_PENDING",
            Self::NotificationNotFound(_) => "E_NOTIFICATION_NOT_FOUND",
            Self::NotFriendRequest(_) => "E_NOT_FRIEND_REQUEST",
            Self::RequestNotFound(_) | Self::NoPendingRequest { .. } => "E_REQUEST_NOT_FOUND",
            Self::NotRecipient => "E_NOT_RECIPIENT",
            Self::NotPending { .. } => "E_NOT_PENDING",
            Self::FriendshipNotFound { .. } => "E_FRIENDSHIP_NOT_FOUND",
            Self::Conflict => "E_CONFLICT",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Conflict => true,
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Result of a send. A second send while the first is still pending is
/// not an error, but nothing new is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(FriendRequest),
    AlreadyPending(FriendRequest),
}

impl SendOutcome {
    #[must_use]
    pub fn request(&self) -> &FriendRequest {
        match self {
            Self::Sent(r) | Self::AlreadyPending(r) => r,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendView {
    pub user_id: UserId,
    pub username: String,
    pub nickname: String,
    pub online: bool,
}

async fn display_name(state: &AppState, user_id: UserId) -> Result<String, FriendError> {
    state
        .directory
        .user_by_id(user_id)
        .await?
        .map(|u| u.display_name().to_owned())
        .ok_or(FriendError::UserNotFound(user_id))
}

/// Store a notification for `user_id` and push it if they are online.
async fn notify(
    state: &AppState,
    user_id: UserId,
    kind: &str,
    message: &str,
    related_id: FriendRequestId,
) -> Result<(), FriendError> {
    let notification = state
        .store
        .upsert_notification(user_id, kind, message, Some(related_id))
        .await?;
    fanout::deliver(&state.registry, [user_id], &fanout::notification_event(&notification));
    Ok(())
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Send (or re-send) a friend request from `from` to `to`.
///
/// # Errors
///
/// Self request, unknown user, existing friendship, an opposite pending
/// request, or store failure.
pub async fn send_request(state: &AppState, from: UserId, to: UserId) -> Result<SendOutcome, FriendError> {
    if from == to {
        return Err(FriendError::SelfRequest);
    }
    let sender = display_name(state, from).await?;
    if state.directory.user_by_id(to).await?.is_none() {
        return Err(FriendError::UserNotFound(to));
    }
    if state.directory.are_friends(from, to).await? {
        return Err(FriendError::AlreadyFriends);
    }
    if let Some(incoming) = state.store.friend_request_between(to, from).await?
        && incoming.status == FriendRequestStatus::Pending
    {
        return Err(FriendError::IncomingPending(incoming.id));
    }

    let request = match state.store.friend_request_between(from, to).await? {
        Some(existing) if existing.status == FriendRequestStatus::Pending => {
            tracing::debug!(from, to, request_id = existing.id, "friends: request already pending");
            return Ok(SendOutcome::AlreadyPending(existing));
        }
        Some(mut existing) => {
            if !state.store.revive_friend_request(existing.id).await? {
                return Err(FriendError::Conflict);
            }
            existing.status = FriendRequestStatus::Pending;
            existing
        }
        None => state.store.create_friend_request(from, to).await?,
    };

    let message = format!("{sender} sent you a friend request");
    notify(state, to, NOTIFICATION_FRIEND_REQUEST, &message, request.id).await?;
    tracing::info!(from, to, request_id = request.id, "friends: request sent");
    Ok(SendOutcome::Sent(request))
}

/// Resolve a `friend_request` notification owned by `user_id` to the
/// pending request it points at.
async fn pending_request_for(
    state: &AppState,
    user_id: UserId,
    notification_id: NotificationId,
) -> Result<FriendRequest, FriendError> {
    let notification = state
        .store
        .notification(notification_id)
        .await?
        .filter(|n| n.user_id == user_id)
        .ok_or(FriendError::NotificationNotFound(notification_id))?;
    if notification.kind != NOTIFICATION_FRIEND_REQUEST {
        return Err(FriendError::NotFriendRequest(notification_id));
    }
    let request_id = notification
        .related_id
        .ok_or(FriendError::NotFriendRequest(notification_id))?;
    let request = state
        .store
        .friend_request(request_id)
        .await?
        .ok_or(FriendError::RequestNotFound(request_id))?;
    if request.to_user_id != user_id {
        return Err(FriendError::NotRecipient);
    }
    if request.status != FriendRequestStatus::Pending {
        return Err(FriendError::NotPending { id: request.id, status: request.status.as_str() });
    }
    Ok(request)
}

/// Accept the request behind `notification_id`. Returns the new friend.
///
/// # Errors
///
/// Notification or request validation failures, existing friendship, or a
/// concurrent answer (`Conflict`).
pub async fn accept_request(
    state: &AppState,
    user_id: UserId,
    notification_id: NotificationId,
) -> Result<UserId, FriendError> {
    let request = pending_request_for(state, user_id, notification_id).await?;
    let sender = request.from_user_id;
    if state.directory.are_friends(sender, user_id).await? {
        return Err(FriendError::AlreadyFriends);
    }
    if !state.store.accept_friend_request(request.id).await? {
        return Err(FriendError::Conflict);
    }
    state.store.mark_notification_read(notification_id, user_id).await?;

    let accepter = display_name(state, user_id).await?;
    let message = format!("{accepter} accepted your friend request");
    notify(state, sender, NOTIFICATION_FRIEND_REQUEST_ACCEPTED, &message, request.id).await?;

    tracing::info!(request_id = request.id, from = sender, to = user_id, "friends: request accepted");
    Ok(sender)
}

/// Reject the request behind `notification_id`.
///
/// # Errors
///
/// Notification or request validation failures, or `Conflict`.
pub async fn reject_request(
    state: &AppState,
    user_id: UserId,
    notification_id: NotificationId,
) -> Result<(), FriendError> {
    let request = pending_request_for(state, user_id, notification_id).await?;
    if !state.store.reject_friend_request(request.id).await? {
        return Err(FriendError::Conflict);
    }
    state.store.mark_notification_read(notification_id, user_id).await?;
    tracing::info!(request_id = request.id, from = request.from_user_id, to = user_id, "friends: request rejected");
    Ok(())
}

/// Withdraw a pending request. The recipient is told live; nothing is
/// stored for them.
///
/// # Errors
///
/// `NoPendingRequest` when there is nothing to cancel, or store failure.
pub async fn cancel_request(state: &AppState, from: UserId, to: UserId) -> Result<FriendRequestId, FriendError> {
    let request_id = state
        .store
        .delete_pending_friend_request(from, to)
        .await?
        .ok_or(FriendError::NoPendingRequest { from, to })?;

    let sender = display_name(state, from).await.unwrap_or_else(|_| from.to_string());
    let event = fanout::transient_notification(
        NOTIFICATION_FRIEND_REQUEST_CANCELLED,
        &format!("{sender} cancelled their friend request"),
        Some(request_id),
    );
    fanout::deliver(&state.registry, [to], &event);

    tracing::info!(request_id, from, to, "friends: request cancelled");
    Ok(request_id)
}

// =============================================================================
// FRIENDSHIPS
// =============================================================================

/// Remove a friendship in both directions.
///
/// # Errors
///
/// `FriendshipNotFound` when `user -> friend` does not exist, or store failure.
pub async fn remove_friend(state: &AppState, user_id: UserId, friend_id: UserId) -> Result<(), FriendError> {
    if !state.store.remove_friendship(user_id, friend_id).await? {
        return Err(FriendError::FriendshipNotFound { user: user_id, friend: friend_id });
    }
    tracing::info!(user_id, friend_id, "friends: removed");
    Ok(())
}

/// Mutual friends of `user_id` with their live online flag, by username.
///
/// # Errors
///
/// Store failure.
pub async fn list_friends(state: &AppState, user_id: UserId) -> Result<Vec<FriendView>, FriendError> {
    let ids = state.directory.friend_ids(user_id).await?;
    let mut friends = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(user) = state.directory.user_by_id(id).await? else {
            tracing::warn!(user_id, friend_id = id, "friends: edge points at missing user");
            continue;
        };
        friends.push(FriendView {
            user_id: id,
            nickname: user.display_name().to_owned(),
            username: user.username,
            online: state.registry.is_online(id),
        });
    }
    friends.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(friends)
}

/// Compact `username,online|` form read by the device firmware, with a
/// trailing separator when non-empty.
#[must_use]
pub fn compact_list(friends: &[FriendView]) -> String {
    friends
        .iter()
        .map(|f| format!("{},{}|", f.username, u8::from(f.online)))
        .collect()
}

#[cfg(test)]
#[path = "friends_test.rs"]
mod tests;
