//! Friend graph and notification routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiResult};
use crate::services::friends::{self, FriendError, SendOutcome};
use crate::services::notification::{self, NotificationError};
use crate::state::AppState;
use crate::store::{NotificationId, UserId};

#[derive(Deserialize)]
pub struct PairBody {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
}

#[derive(Deserialize)]
pub struct AnswerBody {
    pub user_id: UserId,
    pub notification_id: NotificationId,
}

#[derive(Deserialize)]
pub struct MarkReadBody {
    pub user_id: UserId,
}

pub(crate) fn friend_error_to_status(err: &FriendError) -> StatusCode {
    match err {
        FriendError::SelfRequest
        | FriendError::AlreadyFriends
        | FriendError::IncomingPending(_)
        | FriendError::NotFriendRequest(_)
        | FriendError::NotPending { .. } => StatusCode::BAD_REQUEST,
        FriendError::NotRecipient => StatusCode::FORBIDDEN,
        FriendError::UserNotFound(_)
        | FriendError::NotificationNotFound(_)
        | FriendError::RequestNotFound(_)
        | FriendError::NoPendingRequest { .. }
        | FriendError::FriendshipNotFound { .. } => StatusCode::NOT_FOUND,
        FriendError::Conflict => StatusCode::CONFLICT,
        FriendError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FriendError> for ApiError {
    fn from(err: FriendError) -> Self {
        Self::new(friend_error_to_status(&err), &err)
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        let status = match err {
            NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
            NotificationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, &err)
    }
}

// =============================================================================
// FRIENDS
// =============================================================================

/// `GET /api/friends/:user_id/list` — friends with live online flags.
pub async fn list_friends(State(state): State<AppState>, Path(user_id): Path<UserId>) -> ApiResult {
    let friends = friends::list_friends(&state, user_id).await?;
    Ok(Json(json!({
        "success": true,
        "compact": friends::compact_list(&friends),
        "friends": friends,
    })))
}

/// `DELETE /api/friends/:user_id/:friend_id` — unfriend both ways.
pub async fn remove_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(UserId, UserId)>,
) -> ApiResult {
    friends::remove_friend(&state, user_id, friend_id).await?;
    Ok(Json(json!({ "success": true, "message": "Friend removed successfully" })))
}

// =============================================================================
// FRIEND REQUESTS
// =============================================================================

/// `POST /api/friend-requests` — send a request.
///
/// A repeat send while pending is answered with `success: false` and the
/// existing request, not an error status.
pub async fn send_request(State(state): State<AppState>, Json(body): Json<PairBody>) -> ApiResult {
    let outcome = friends::send_request(&state, body.from_user_id, body.to_user_id).await?;
    let (success, message) = match &outcome {
        SendOutcome::Sent(_) => (true, "Friend request sent"),
        SendOutcome::AlreadyPending(_) => (false, "Friend request already pending"),
    };
    let request = outcome.request();
    Ok(Json(json!({
        "success": success,
        "message": message,
        "request_id": request.id,
        "status": request.status,
    })))
}

/// `POST /api/friend-requests/accept`
pub async fn accept_request(State(state): State<AppState>, Json(body): Json<AnswerBody>) -> ApiResult {
    let friend_id = friends::accept_request(&state, body.user_id, body.notification_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Friend request accepted successfully",
        "friend_id": friend_id,
    })))
}

/// `POST /api/friend-requests/reject`
pub async fn reject_request(State(state): State<AppState>, Json(body): Json<AnswerBody>) -> ApiResult {
    friends::reject_request(&state, body.user_id, body.notification_id).await?;
    Ok(Json(json!({ "success": true, "message": "Friend request rejected successfully" })))
}

/// `POST /api/friend-requests/cancel`
pub async fn cancel_request(State(state): State<AppState>, Json(body): Json<PairBody>) -> ApiResult {
    let request_id = friends::cancel_request(&state, body.from_user_id, body.to_user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Friend request cancelled successfully",
        "request_id": request_id,
    })))
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// `GET /api/notifications/:user_id` — newest first.
pub async fn list_notifications(State(state): State<AppState>, Path(user_id): Path<UserId>) -> ApiResult {
    let (notifications, unread) = notification::list(&state, user_id).await?;
    Ok(Json(json!({
        "success": true,
        "unread_count": unread,
        "notifications": notifications,
    })))
}

/// `POST /api/notifications/:id/read`
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
    Json(body): Json<MarkReadBody>,
) -> ApiResult {
    notification::mark_read(&state, id, body.user_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[path = "friends_test.rs"]
mod tests;
