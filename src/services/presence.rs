//! Presence broadcasting on bind and unbind.
//!
//! Presence is not stored anywhere: a user is online exactly when the
//! registry holds a binding for them. These helpers translate binding
//! changes into `user_status_update` frames for mutual friends.

use super::fanout::{self, status_update};
use crate::state::AppState;
use crate::store::{StoreError, UserId};

/// Announce `user_id` to its online friends and tell it which friends are
/// already online. Returns those online friends, ascending.
///
/// # Errors
///
/// Returns a store error if the friend list cannot be loaded. Nothing has
/// been sent in that case.
pub async fn on_bind(state: &AppState, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
    let friends = state.directory.friend_ids(user_id).await?;
    let online: Vec<UserId> = friends
        .into_iter()
        .filter(|&friend| friend != user_id && state.registry.is_online(friend))
        .collect();

    let report = fanout::deliver(&state.registry, online.iter().copied(), &status_update(user_id, true));
    for &friend in &online {
        state.registry.send_to_user(user_id, status_update(friend, true));
    }

    tracing::info!(user_id, friends_online = online.len(), notified = report.delivered.len(), "presence: online");
    Ok(online)
}

/// Tell `user_id`'s online friends that it went offline.
pub async fn on_unbind(state: &AppState, user_id: UserId) {
    let friends = match state.directory.friend_ids(user_id).await {
        Ok(friends) => friends,
        Err(e) => {
            tracing::error!(user_id, error = %e, "presence: friend lookup failed on unbind");
            return;
        }
    };
    let report = fanout::deliver(
        &state.registry,
        friends.into_iter().filter(|&f| f != user_id),
        &status_update(user_id, false),
    );
    tracing::info!(user_id, notified = report.delivered.len(), "presence: offline");
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
