//! Event fanout — push one frame to a set of users.
//!
//! Delivery is best effort and never aborts: an offline or unreachable
//! target is logged and counted, and the remaining targets still receive
//! the frame. There is no offline queue.

use std::collections::BTreeSet;

use serde_json::json;

use super::registry::ConnectionRegistry;
use crate::frame::{Frame, TYPE_GAME_EVENT, TYPE_NOTIFICATION, TYPE_USER_STATUS_UPDATE};
use crate::store::{Notification, UserId};

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// Per-call delivery outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<UserId>,
    pub offline: Vec<UserId>,
}

/// Send `frame` to every distinct target.
pub fn deliver(
    registry: &ConnectionRegistry,
    targets: impl IntoIterator<Item = UserId>,
    frame: &Frame,
) -> DeliveryReport {
    let unique: BTreeSet<UserId> = targets.into_iter().collect();
    let mut report = DeliveryReport::default();
    for user_id in unique {
        if registry.send_to_user(user_id, frame.clone()) {
            report.delivered.push(user_id);
        } else {
            tracing::debug!(user_id, kind = %frame.kind, "fanout: target not reachable");
            report.offline.push(user_id);
        }
    }
    report
}

// =============================================================================
// EVENT BUILDERS
// =============================================================================

#[must_use]
pub fn status_update(user_id: UserId, online: bool) -> Frame {
    Frame::new(TYPE_USER_STATUS_UPDATE)
        .with_data("user_id", user_id)
        .with_data("status", if online { STATUS_ONLINE } else { STATUS_OFFLINE })
}

#[must_use]
pub fn notification_event(notification: &Notification) -> Frame {
    Frame::new(TYPE_NOTIFICATION)
        .with_data("notification_id", notification.id)
        .with_data("notification_type", notification.kind.as_str())
        .with_data("message", notification.message.as_str())
        .with_data("related_id", json!(notification.related_id))
        .with_data("read", notification.read)
        .with_data("created_at", notification.created_at)
}

/// Notification-shaped event for something that has no stored row,
/// such as a cancelled friend request.
#[must_use]
pub fn transient_notification(kind: &str, message: &str, related_id: Option<i64>) -> Frame {
    Frame::new(TYPE_NOTIFICATION)
        .with_data("notification_type", kind)
        .with_data("message", message)
        .with_data("related_id", json!(related_id))
        .with_timestamp()
}

/// `game_event` frame; callers add the event-specific keys.
#[must_use]
pub fn game_event(event_type: &str, session_id: i64) -> Frame {
    Frame::new(TYPE_GAME_EVENT)
        .with_data("event_type", event_type)
        .with_data("session_id", session_id)
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
