//! Connection registry — live connections and the user ↔ client binding.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket connection registers an outbound sender on accept and is
//! assigned a client id. An `init` or `login` frame later binds a user id to
//! that client. At most one connection per user is live: binding a user that
//! is already bound elsewhere evicts the old connection.
//!
//! INVARIANTS
//! ==========
//! - `user_to_client[u] == c` implies `client_to_user[c] == u`, and the
//!   reverse. Both directions change together under one lock.
//! - A binding always points at a registered connection.
//!
//! Delivery never blocks: `send_to_user` uses `try_send` and reports `false`
//! for offline users, full buffers or closed channels. A closed channel
//! means the connection task is gone, so the stale binding is removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::frame::Frame;
use crate::store::UserId;

// =============================================================================
// TYPES
// =============================================================================

/// Message delivered to a connection task through its outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and write the frame to the socket.
    Frame(Frame),
    /// The user bound a newer connection; send `evicted` and close.
    Evicted,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown connection: {0}")]
    UnknownClient(Uuid),
}

impl crate::frame::ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownClient(_) => "E_UNKNOWN_CLIENT",
        }
    }
}

/// What `bind` displaced. Callers broadcast presence from this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Older connection of the same user that was evicted.
    pub evicted_client: Option<Uuid>,
    /// Different user that was previously bound to this connection.
    pub previous_user: Option<UserId>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<Uuid, mpsc::Sender<Outbound>>,
    user_to_client: HashMap<UserId, Uuid>,
    client_to_user: HashMap<Uuid, UserId>,
}

impl Inner {
    fn unbind_user(&mut self, user_id: UserId) -> Option<Uuid> {
        let client_id = self.user_to_client.remove(&user_id)?;
        self.client_to_user.remove(&client_id);
        Some(client_id)
    }

    fn unbind_client(&mut self, client_id: Uuid) -> Option<UserId> {
        let user_id = self.client_to_user.remove(&client_id)?;
        if self.user_to_client.get(&user_id) == Some(&client_id) {
            self.user_to_client.remove(&user_id);
        }
        Some(user_id)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new, unbound connection.
    pub fn connect(&self, tx: mpsc::Sender<Outbound>) -> Uuid {
        let client_id = Uuid::new_v4();
        self.lock().connections.insert(client_id, tx);
        client_id
    }

    /// Bind `user_id` to `client_id`, evicting any older connection of the
    /// same user.
    ///
    /// # Errors
    ///
    /// Returns `UnknownClient` if the connection was never registered or has
    /// already disconnected.
    pub fn bind(&self, client_id: Uuid, user_id: UserId) -> Result<BindOutcome, RegistryError> {
        let mut inner = self.lock();
        if !inner.connections.contains_key(&client_id) {
            return Err(RegistryError::UnknownClient(client_id));
        }

        let mut outcome = BindOutcome::default();

        match inner.client_to_user.get(&client_id).copied() {
            Some(current) if current == user_id => return Ok(outcome),
            Some(current) => {
                inner.unbind_user(current);
                outcome.previous_user = Some(current);
            }
            None => {}
        }

        if let Some(old_client) = inner.unbind_user(user_id) {
            outcome.evicted_client = Some(old_client);
            // Dropping the only sender ends the old task's outbound stream
            // even when the eviction notice does not fit in its buffer.
            if let Some(old_tx) = inner.connections.remove(&old_client)
                && old_tx.try_send(Outbound::Evicted).is_err()
            {
                tracing::warn!(%old_client, user_id, "registry: evicted connection buffer full, closing without notice");
            }
        }

        inner.user_to_client.insert(user_id, client_id);
        inner.client_to_user.insert(client_id, user_id);
        Ok(outcome)
    }

    /// Remove the connection and its binding. Returns the user that was
    /// bound to it, if any.
    pub fn unbind_and_disconnect(&self, client_id: Uuid) -> Option<UserId> {
        let mut inner = self.lock();
        inner.connections.remove(&client_id);
        inner.unbind_client(client_id)
    }

    /// Queue a frame for the user's live connection.
    ///
    /// Returns `false` when the user is offline or the write failed. A closed
    /// channel clears the stale binding.
    pub fn send_to_user(&self, user_id: UserId, frame: Frame) -> bool {
        let mut inner = self.lock();
        let Some(&client_id) = inner.user_to_client.get(&user_id) else {
            return false;
        };
        let Some(tx) = inner.connections.get(&client_id) else {
            tracing::warn!(%client_id, user_id, "registry: binding without connection");
            inner.unbind_user(user_id);
            return false;
        };
        match tx.try_send(Outbound::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%client_id, user_id, "registry: outbound buffer full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::info!(%client_id, user_id, "registry: clearing stale binding");
                inner.unbind_user(user_id);
                inner.connections.remove(&client_id);
                false
            }
        }
    }

    #[must_use]
    pub fn user_for_client(&self, client_id: Uuid) -> Option<UserId> {
        self.lock().client_to_user.get(&client_id).copied()
    }

    #[must_use]
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.lock().user_to_client.contains_key(&user_id)
    }

    /// Bound users, ascending.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.lock().user_to_client.keys().copied().collect();
        users.sort_unstable();
        users
    }

    /// Registered connections, bound or not.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Check the binding invariant. Used by tests after arbitrary sequences.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let inner = self.lock();
        inner.user_to_client.len() == inner.client_to_user.len()
            && inner.user_to_client.iter().all(|(user, client)| {
                inner.client_to_user.get(client) == Some(user) && inner.connections.contains_key(client)
            })
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
