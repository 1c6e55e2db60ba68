//! Stored notifications — listing and read state.

use crate::frame::ErrorCode;
use crate::state::AppState;
use crate::store::{Notification, NotificationId, StoreError, UserId};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification {0} not found or does not belong to user")]
    NotFound(NotificationId),
    #[error("notification store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for NotificationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOTIFICATION_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }
}

/// A user's notifications, newest first, plus the unread count.
///
/// # Errors
///
/// Store failure.
pub async fn list(state: &AppState, user_id: UserId) -> Result<(Vec<Notification>, usize), NotificationError> {
    let notifications = state.store.notifications_for(user_id).await?;
    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok((notifications, unread))
}

/// Mark one of `user_id`'s notifications as read.
///
/// # Errors
///
/// `NotFound` when it does not exist or belongs to someone else.
pub async fn mark_read(state: &AppState, id: NotificationId, user_id: UserId) -> Result<(), NotificationError> {
    if state.store.mark_notification_read(id, user_id).await? {
        Ok(())
    } else {
        Err(NotificationError::NotFound(id))
    }
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
