//! In-process store used when `DATABASE_URL` is unset, and by tests.
//!
//! One mutex guards every table, so each trait method is atomic the same way
//! a single Postgres transaction would be.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use super::{
    FriendRequest, FriendRequestId, FriendRequestStatus, GameMove, GameParticipant, GameSession, MoveEffect, MoveInsert,
    Notification, NotificationId, ParticipantRole, ParticipantStatus, SessionId, SessionStatus, Store, StoreError,
    User, UserDirectory, UserId, NOTIFICATION_FRIEND_REQUEST,
};
use crate::frame::now_ms;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<UserId, User>,
    /// Directed edges; a friendship is both `(a, b)` and `(b, a)`.
    friends: BTreeSet<(UserId, UserId)>,
    friend_requests: HashMap<FriendRequestId, FriendRequest>,
    notifications: HashMap<NotificationId, Notification>,
    sessions: HashMap<SessionId, GameSession>,
    participants: Vec<GameParticipant>,
    moves: Vec<GameMove>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn participant_mut(&mut self, session_id: SessionId, user_id: UserId) -> Option<&mut GameParticipant> {
        self.participants
            .iter_mut()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
    }

    fn insert_participant(&mut self, session_id: SessionId, user_id: UserId, role: ParticipantRole, now: i64) {
        let (status, ready) = match role {
            ParticipantRole::Host => (ParticipantStatus::Ready, true),
            ParticipantRole::Player => (ParticipantStatus::Invited, false),
        };
        self.participants.push(GameParticipant { session_id, user_id, role, status, ready, joined_at: now });
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Test fixtures.
#[cfg(test)]
impl MemoryStore {
    /// Seed a user with an explicit id.
    pub fn add_user(&self, id: UserId, username: &str, nickname: Option<&str>) -> User {
        let mut tables = self.lock();
        let user = User {
            id,
            username: username.to_owned(),
            nickname: nickname.map(str::to_owned),
            pin_hash: String::new(),
        };
        tables.next_id = tables.next_id.max(id);
        tables.users.insert(id, user.clone());
        user
    }

    /// Seed a mutual friendship.
    pub fn befriend(&self, a: UserId, b: UserId) {
        let mut tables = self.lock();
        tables.friends.insert((a, b));
        tables.friends.insert((b, a));
    }

    /// Seed a single directed edge, leaving the friendship one-sided.
    pub fn add_friend_edge(&self, from: UserId, to: UserId) {
        self.lock().friends.insert((from, to));
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, pin_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::DuplicateUsername(username.to_owned()));
        }
        let id = tables.next_id();
        let user = User { id, username: username.to_owned(), nickname: None, pin_hash: pin_hash.to_owned() };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, StoreError> {
        let tables = self.lock();
        let forward = tables.friends.contains(&(a, b));
        let backward = tables.friends.contains(&(b, a));
        if forward != backward {
            tracing::warn!(a, b, "one-sided friend edge");
        }
        Ok(forward && backward)
    }

    async fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .friends
            .iter()
            .filter(|(from, to)| *from == user_id && tables.friends.contains(&(*to, *from)))
            .map(|(_, to)| *to)
            .collect())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    // ---- friend requests ----------------------------------------------------

    async fn friend_request(&self, id: FriendRequestId) -> Result<Option<FriendRequest>, StoreError> {
        Ok(self.lock().friend_requests.get(&id).cloned())
    }

    async fn friend_request_between(&self, from: UserId, to: UserId) -> Result<Option<FriendRequest>, StoreError> {
        Ok(self
            .lock()
            .friend_requests
            .values()
            .find(|r| r.from_user_id == from && r.to_user_id == to)
            .cloned())
    }

    async fn create_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest, StoreError> {
        let mut tables = self.lock();
        if tables
            .friend_requests
            .values()
            .any(|r| r.from_user_id == from && r.to_user_id == to)
        {
            return Err(StoreError::DuplicateFriendRequest);
        }
        let id = tables.next_id();
        let request = FriendRequest { id, from_user_id: from, to_user_id: to, status: FriendRequestStatus::Pending };
        tables.friend_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn revive_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.friend_requests.get_mut(&id) {
            Some(r) if r.status != FriendRequestStatus::Pending => {
                r.status = FriendRequestStatus::Pending;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn accept_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let Some(request) = tables.friend_requests.get_mut(&id) else {
            return Ok(false);
        };
        if request.status != FriendRequestStatus::Pending {
            return Ok(false);
        }
        request.status = FriendRequestStatus::Accepted;
        let (a, b) = (request.from_user_id, request.to_user_id);
        tables.friends.insert((a, b));
        tables.friends.insert((b, a));
        Ok(true)
    }

    async fn reject_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.friend_requests.get_mut(&id) {
            Some(r) if r.status == FriendRequestStatus::Pending => {
                r.status = FriendRequestStatus::Rejected;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_pending_friend_request(
        &self,
        from: UserId,
        to: UserId,
    ) -> Result<Option<FriendRequestId>, StoreError> {
        let mut tables = self.lock();
        let Some(id) = tables
            .friend_requests
            .values()
            .find(|r| r.from_user_id == from && r.to_user_id == to && r.status == FriendRequestStatus::Pending)
            .map(|r| r.id)
        else {
            return Ok(None);
        };
        tables
            .notifications
            .retain(|_, n| !(n.kind == NOTIFICATION_FRIEND_REQUEST && n.related_id == Some(id)));
        tables.friend_requests.remove(&id);
        Ok(Some(id))
    }

    async fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        if !tables.friends.remove(&(user_id, friend_id)) {
            return Ok(false);
        }
        tables.friends.remove(&(friend_id, user_id));
        Ok(true)
    }

    // ---- notifications ------------------------------------------------------

    async fn upsert_notification(
        &self,
        user_id: UserId,
        kind: &str,
        message: &str,
        related_id: Option<i64>,
    ) -> Result<Notification, StoreError> {
        let mut tables = self.lock();
        let now = now_ms();
        if let Some(existing) = tables
            .notifications
            .values_mut()
            .find(|n| n.user_id == user_id && n.kind == kind && n.related_id == related_id)
        {
            existing.message = message.to_owned();
            existing.read = false;
            existing.created_at = now;
            return Ok(existing.clone());
        }
        let id = tables.next_id();
        let notification = Notification {
            id,
            user_id,
            kind: kind.to_owned(),
            message: message.to_owned(),
            related_id,
            read: false,
            created_at: now,
        };
        tables.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>, StoreError> {
        Ok(self.lock().notifications.get(&id).cloned())
    }

    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>, StoreError> {
        let mut list: Vec<Notification> = self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn mark_notification_read(&self, id: NotificationId, user_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ---- game sessions ------------------------------------------------------

    async fn create_session(
        &self,
        host_user_id: UserId,
        game_type: &str,
        max_players: i32,
        invitees: &[UserId],
    ) -> Result<GameSession, StoreError> {
        let mut tables = self.lock();
        let now = now_ms();
        let id = tables.next_id();
        let session = GameSession {
            id,
            host_user_id,
            game_type: game_type.to_owned(),
            status: SessionStatus::Waiting,
            max_players,
            winner_user_id: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        tables.sessions.insert(id, session.clone());
        tables.insert_participant(id, host_user_id, ParticipantRole::Host, now);
        for &user_id in invitees {
            tables.insert_participant(id, user_id, ParticipantRole::Player, now);
        }
        Ok(session)
    }

    async fn session(&self, id: SessionId) -> Result<Option<GameSession>, StoreError> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    async fn participants(&self, session_id: SessionId) -> Result<Vec<GameParticipant>, StoreError> {
        // Insertion order already matches join order with the host first.
        Ok(self
            .lock()
            .participants
            .iter()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn add_invitees(
        &self,
        session_id: SessionId,
        invitees: &[UserId],
        limit: usize,
    ) -> Result<Vec<UserId>, StoreError> {
        let mut tables = self.lock();
        let now = now_ms();
        let mut added = Vec::new();
        for &user_id in invitees {
            if added.len() >= limit {
                break;
            }
            if tables.participant_mut(session_id, user_id).is_some() {
                continue;
            }
            tables.insert_participant(session_id, user_id, ParticipantRole::Player, now);
            added.push(user_id);
        }
        if !added.is_empty()
            && let Some(session) = tables.sessions.get_mut(&session_id)
        {
            session.updated_at = now;
        }
        Ok(added)
    }

    async fn update_participant(
        &self,
        session_id: SessionId,
        user_id: UserId,
        status: Option<ParticipantStatus>,
        ready: bool,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let Some(participant) = tables.participant_mut(session_id, user_id) else {
            return Ok(false);
        };
        if let Some(status) = status {
            participant.status = status;
        }
        participant.ready = ready;
        Ok(true)
    }

    async fn transition_session(
        &self,
        id: SessionId,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let Some(session) = tables.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if !from.contains(&session.status) {
            return Ok(false);
        }
        let now = now_ms();
        session.status = to;
        session.updated_at = now;
        if to == SessionStatus::InProgress {
            session.started_at = Some(now);
        }
        Ok(true)
    }

    async fn cancel_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let Some(session) = tables.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.status.is_terminal() {
            return Ok(false);
        }
        session.status = SessionStatus::Cancelled;
        session.updated_at = now_ms();
        for p in tables.participants.iter_mut().filter(|p| p.session_id == id) {
            p.status = ParticipantStatus::Cancelled;
            p.ready = false;
        }
        Ok(true)
    }

    async fn active_session_ids(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError> {
        let tables = self.lock();
        let mut ids: Vec<SessionId> = tables
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| tables.sessions.get(&p.session_id))
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.id)
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();
        Ok(ids)
    }

    async fn moves(&self, session_id: SessionId) -> Result<Vec<GameMove>, StoreError> {
        let mut list: Vec<GameMove> = self
            .lock()
            .moves
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        list.sort_by_key(|m| m.move_number);
        Ok(list)
    }

    async fn insert_move(
        &self,
        session_id: SessionId,
        user_id: UserId,
        row: i32,
        col: i32,
        move_number: i32,
        effect: MoveEffect,
    ) -> Result<MoveInsert, StoreError> {
        let mut tables = self.lock();
        let in_progress = tables
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.status == SessionStatus::InProgress);
        if !in_progress {
            return Ok(MoveInsert::NotInProgress);
        }
        let same_session = || tables.moves.iter().filter(|m| m.session_id == session_id);
        if same_session().any(|m| m.row == row && m.col == col) {
            return Ok(MoveInsert::CellOccupied);
        }
        if same_session().any(|m| m.move_number == move_number) {
            return Ok(MoveInsert::NumberTaken);
        }
        let id = tables.next_id();
        let game_move = GameMove { id, session_id, user_id, row, col, move_number };
        tables.moves.push(game_move.clone());

        if let MoveEffect::Complete { winner } = effect
            && let Some(session) = tables.sessions.get_mut(&session_id)
        {
            let now = now_ms();
            session.status = SessionStatus::Completed;
            session.winner_user_id = winner;
            session.updated_at = now;
            session.completed_at = Some(now);
        }
        Ok(MoveInsert::Inserted(game_move))
    }
}
