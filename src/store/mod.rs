//! Collaborator contracts — the user directory and the durable store.
//!
//! ARCHITECTURE
//! ============
//! The core never opens database connections. It talks to two traits,
//! injected through `AppState`:
//! - `UserDirectory`: users and the accepted-friendship graph.
//! - `Store`: friend requests, notifications, game sessions and moves.
//!
//! `PgStore` implements both over a pooled SQLx connection; `MemoryStore`
//! implements both in process for development and tests.
//!
//! CONCURRENCY
//! ===========
//! State transitions are conditional (`... WHERE status IN (...)`). A
//! transition that matches zero rows returns `false`; services surface that
//! as a retryable conflict because another actor changed the row first.

pub mod memory;
pub mod postgres;

use serde::Serialize;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type UserId = i64;
pub type SessionId = i64;
pub type FriendRequestId = i64;
pub type NotificationId = i64;
pub type MoveId = i64;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("friend request already exists")]
    DuplicateFriendRequest,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateUsername(_) => "E_DUPLICATE_USERNAME",
            Self::DuplicateFriendRequest => "E_DUPLICATE_FRIEND_REQUEST",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::DuplicateFriendRequest)
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub nickname: Option<String>,
    #[serde(skip)]
    pub pin_hash: String,
}

impl User {
    /// Nickname when set, username otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

// =============================================================================
// FRIEND REQUESTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub status: FriendRequestStatus,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

pub const NOTIFICATION_FRIEND_REQUEST: &str = "friend_request";
pub const NOTIFICATION_FRIEND_REQUEST_ACCEPTED: &str = "friend_request_accepted";
pub const NOTIFICATION_FRIEND_REQUEST_CANCELLED: &str = "friend_request_cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub read: bool,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
}

// =============================================================================
// GAME SESSIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Ready,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Statuses that still accept invites and responses.
    pub const OPEN: [Self; 2] = [Self::Waiting, Self::Ready];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(Self::Waiting),
            "ready" => Some(Self::Ready),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Host,
    Player,
}

impl ParticipantRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Player => "player",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "host" => Some(Self::Host),
            "player" => Some(Self::Player),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Invited,
    Accepted,
    Declined,
    Ready,
    Cancelled,
    Left,
}

impl ParticipantStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Ready => "ready",
            Self::Cancelled => "cancelled",
            Self::Left => "left",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invited" => Some(Self::Invited),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            "ready" => Some(Self::Ready),
            "cancelled" => Some(Self::Cancelled),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    /// Counts toward "everyone accepted" when recomputing lobby status.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSession {
    pub id: SessionId,
    pub host_user_id: UserId,
    pub game_type: String,
    pub status: SessionStatus,
    pub max_players: i32,
    pub winner_user_id: Option<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameParticipant {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub ready: bool,
    pub joined_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameMove {
    pub id: MoveId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub row: i32,
    pub col: i32,
    pub move_number: i32,
}

/// Outcome of a conditional move insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveInsert {
    Inserted(GameMove),
    /// `(session, row, col)` already taken.
    CellOccupied,
    /// `(session, move_number)` already taken by a concurrent move.
    NumberTaken,
    /// The session left `in_progress` before the move was written.
    NotInProgress,
}

/// What an inserted move does to its session, applied in the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    Continue,
    /// `in_progress -> completed`. No winner means a draw.
    Complete { winner: Option<UserId> },
}

// =============================================================================
// TRAITS
// =============================================================================

/// Users and the accepted-friendship graph.
///
/// Friendship requires both directed edges. A one-sided edge is a data
/// integrity problem: implementations log it and report "not friends".
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, username: &str, pin_hash: &str) -> Result<User, StoreError>;

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, StoreError>;

    /// Ids of every mutual friend of `user_id`, ascending.
    async fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError>;
}

/// Durable state behind the lobby: friend requests, notifications, sessions.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ---- friend requests ----------------------------------------------------

    async fn friend_request(&self, id: FriendRequestId) -> Result<Option<FriendRequest>, StoreError>;

    async fn friend_request_between(&self, from: UserId, to: UserId) -> Result<Option<FriendRequest>, StoreError>;

    /// Insert a pending request. `DuplicateFriendRequest` if the pair exists.
    async fn create_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest, StoreError>;

    /// `rejected|accepted -> pending`. False if the row was already pending or gone.
    async fn revive_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError>;

    /// `pending -> accepted` plus both friend edges, atomically.
    /// False if the request was no longer pending.
    async fn accept_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError>;

    /// `pending -> rejected`. False if the request was no longer pending.
    async fn reject_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError>;

    /// Delete a pending request and its notification. Returns the deleted id.
    async fn delete_pending_friend_request(
        &self,
        from: UserId,
        to: UserId,
    ) -> Result<Option<FriendRequestId>, StoreError>;

    /// Delete both friend edges. False if the `user -> friend` edge was absent.
    async fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<bool, StoreError>;

    // ---- notifications ------------------------------------------------------

    /// Insert a notification, or refresh the existing `(user, kind, related_id)`
    /// row back to unread with the new message.
    async fn upsert_notification(
        &self,
        user_id: UserId,
        kind: &str,
        message: &str,
        related_id: Option<i64>,
    ) -> Result<Notification, StoreError>;

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>, StoreError>;

    /// Newest first.
    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>, StoreError>;

    /// False if the notification does not belong to `user_id`.
    async fn mark_notification_read(&self, id: NotificationId, user_id: UserId) -> Result<bool, StoreError>;

    // ---- game sessions ------------------------------------------------------

    /// Create a `waiting` session, the host participant (ready) and one
    /// `invited` participant per invitee, atomically.
    async fn create_session(
        &self,
        host_user_id: UserId,
        game_type: &str,
        max_players: i32,
        invitees: &[UserId],
    ) -> Result<GameSession, StoreError>;

    async fn session(&self, id: SessionId) -> Result<Option<GameSession>, StoreError>;

    /// Ordered by join time, host first.
    async fn participants(&self, session_id: SessionId) -> Result<Vec<GameParticipant>, StoreError>;

    /// Add invitees up to `limit`, skipping users already in the session.
    /// Returns the users actually added, in input order.
    async fn add_invitees(
        &self,
        session_id: SessionId,
        invitees: &[UserId],
        limit: usize,
    ) -> Result<Vec<UserId>, StoreError>;

    /// Update one participant. `status: None` keeps the current status.
    /// False if the user is not a participant.
    async fn update_participant(
        &self,
        session_id: SessionId,
        user_id: UserId,
        status: Option<ParticipantStatus>,
        ready: bool,
    ) -> Result<bool, StoreError>;

    /// Conditional transition. Sets `started_at` when entering `in_progress`.
    /// False if the current status is not in `from`.
    async fn transition_session(
        &self,
        id: SessionId,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<bool, StoreError>;

    /// Cancel a non-terminal session and every participant, atomically.
    async fn cancel_session(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Sessions the user participates in that are not terminal.
    async fn active_session_ids(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError>;

    /// Ordered by move number.
    async fn moves(&self, session_id: SessionId) -> Result<Vec<GameMove>, StoreError>;

    /// Record a move while the session is `in_progress` and apply `effect`
    /// atomically with it. Nothing is written unless `Inserted` is returned.
    async fn insert_move(
        &self,
        session_id: SessionId,
        user_id: UserId,
        row: i32,
        col: i32,
        move_number: i32,
        effect: MoveEffect,
    ) -> Result<MoveInsert, StoreError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
