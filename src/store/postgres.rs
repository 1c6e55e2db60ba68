//! Postgres-backed store.
//!
//! Queries are runtime-checked (`sqlx::query` + `Row::get`) so the crate
//! builds without a live database. Timestamps leave the database as
//! milliseconds since epoch.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{
    FriendRequest, FriendRequestId, FriendRequestStatus, GameMove, GameParticipant, GameSession, MoveEffect, MoveInsert,
    Notification, NotificationId, ParticipantRole, ParticipantStatus, SessionId, SessionStatus, Store, StoreError,
    User, UserDirectory, UserId, NOTIFICATION_FRIEND_REQUEST,
};

const SESSION_COLUMNS: &str = r"id, host_user_id, game_type, status, max_players, winner_user_id,
    (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at,
    (EXTRACT(EPOCH FROM updated_at) * 1000)::BIGINT AS updated_at,
    (EXTRACT(EPOCH FROM started_at) * 1000)::BIGINT AS started_at,
    (EXTRACT(EPOCH FROM completed_at) * 1000)::BIGINT AS completed_at";

const NOTIFICATION_COLUMNS: &str = r"id, user_id, type, message, related_id, is_read,
    (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at";

const UNIQUE_VIOLATION: &str = "23505";
const MOVE_CELL_CONSTRAINT: &str = "game_moves_cell_key";
const MOVE_NUMBER_CONSTRAINT: &str = "game_moves_number_key";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        pin_hash: row.get("pin_hash"),
    }
}

fn friend_request_from_row(row: &PgRow) -> FriendRequest {
    let status: String = row.get("status");
    FriendRequest {
        id: row.get("id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        status: FriendRequestStatus::parse(&status).unwrap_or(FriendRequestStatus::Pending),
    }
}

fn notification_from_row(row: &PgRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: row.get("type"),
        message: row.get("message"),
        related_id: row.get("related_id"),
        read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

fn session_from_row(row: &PgRow) -> GameSession {
    let status: String = row.get("status");
    GameSession {
        id: row.get("id"),
        host_user_id: row.get("host_user_id"),
        game_type: row.get("game_type"),
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Cancelled),
        max_players: row.get("max_players"),
        winner_user_id: row.get("winner_user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    }
}

fn participant_from_row(row: &PgRow) -> GameParticipant {
    let role: String = row.get("role");
    let status: String = row.get("status");
    GameParticipant {
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
        role: ParticipantRole::parse(&role).unwrap_or(ParticipantRole::Player),
        status: ParticipantStatus::parse(&status).unwrap_or(ParticipantStatus::Left),
        ready: row.get("ready"),
        joined_at: row.get("joined_at"),
    }
}

fn move_from_row(row: &PgRow) -> GameMove {
    GameMove {
        id: row.get("id"),
        session_id: row.get("session_id"),
        user_id: row.get("user_id"),
        row: row.get("cell_row"),
        col: row.get("cell_col"),
        move_number: row.get("move_number"),
    }
}

fn unique_violation(err: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db) = err else {
        return None;
    };
    if db.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return None;
    }
    Some(db.constraint().unwrap_or_default().to_owned())
}

// =============================================================================
// USER DIRECTORY
// =============================================================================

#[async_trait::async_trait]
impl UserDirectory for PgStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, username, nickname, pin_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, username, nickname, pin_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_user(&self, username: &str, pin_hash: &str) -> Result<User, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO users (username, pin_hash) VALUES ($1, $2)
              RETURNING id, username, nickname, pin_hash",
        )
        .bind(username)
        .bind(pin_hash)
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(e) if unique_violation(&e).is_some() => Err(StoreError::DuplicateUsername(username.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, StoreError> {
        let (forward, backward): (bool, bool) = sqlx::query_as(
            r"SELECT
                EXISTS (SELECT 1 FROM friends WHERE user_id = $1 AND friend_id = $2),
                EXISTS (SELECT 1 FROM friends WHERE user_id = $2 AND friend_id = $1)",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;
        if forward != backward {
            tracing::warn!(a, b, "one-sided friend edge");
        }
        Ok(forward && backward)
    }

    async fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let ids = sqlx::query_scalar(
            r"SELECT f.friend_id FROM friends f
              JOIN friends r ON r.user_id = f.friend_id AND r.friend_id = f.user_id
              WHERE f.user_id = $1
              ORDER BY f.friend_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

// =============================================================================
// STORE
// =============================================================================

#[async_trait::async_trait]
impl Store for PgStore {
    // ---- friend requests ----------------------------------------------------

    async fn friend_request(&self, id: FriendRequestId) -> Result<Option<FriendRequest>, StoreError> {
        let row = sqlx::query("SELECT id, from_user_id, to_user_id, status FROM friend_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(friend_request_from_row))
    }

    async fn friend_request_between(&self, from: UserId, to: UserId) -> Result<Option<FriendRequest>, StoreError> {
        let row = sqlx::query(
            r"SELECT id, from_user_id, to_user_id, status FROM friend_requests
              WHERE from_user_id = $1 AND to_user_id = $2",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(friend_request_from_row))
    }

    async fn create_friend_request(&self, from: UserId, to: UserId) -> Result<FriendRequest, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO friend_requests (from_user_id, to_user_id, status) VALUES ($1, $2, 'pending')
              RETURNING id, from_user_id, to_user_id, status",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(row) => Ok(friend_request_from_row(&row)),
            Err(e) if unique_violation(&e).is_some() => Err(StoreError::DuplicateFriendRequest),
            Err(e) => Err(e.into()),
        }
    }

    async fn revive_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"UPDATE friend_requests SET status = 'pending', updated_at = now()
              WHERE id = $1 AND status <> 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn accept_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r"UPDATE friend_requests SET status = 'accepted', updated_at = now()
              WHERE id = $1 AND status = 'pending'
              RETURNING from_user_id, to_user_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let from: UserId = row.get("from_user_id");
        let to: UserId = row.get("to_user_id");
        sqlx::query(
            r"INSERT INTO friends (user_id, friend_id) VALUES ($1, $2), ($2, $1)
              ON CONFLICT DO NOTHING",
        )
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn reject_friend_request(&self, id: FriendRequestId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"UPDATE friend_requests SET status = 'rejected', updated_at = now()
              WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_pending_friend_request(
        &self,
        from: UserId,
        to: UserId,
    ) -> Result<Option<FriendRequestId>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id: Option<FriendRequestId> = sqlx::query_scalar(
            r"DELETE FROM friend_requests
              WHERE from_user_id = $1 AND to_user_id = $2 AND status = 'pending'
              RETURNING id",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(id) = id {
            sqlx::query("DELETE FROM notifications WHERE type = $1 AND related_id = $2")
                .bind(NOTIFICATION_FRIEND_REQUEST)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(id)
    }

    async fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let forward = sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *tx)
            .await?;
        // A lone reverse edge is not the caller's friendship to remove.
        if forward.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
            .bind(friend_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
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
        let existing: Option<NotificationId> = sqlx::query_scalar(
            r"SELECT id FROM notifications
              WHERE user_id = $1 AND type = $2 AND related_id IS NOT DISTINCT FROM $3
              ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .bind(kind)
        .bind(related_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = if let Some(id) = existing {
            let sql = format!(
                r"UPDATE notifications SET message = $2, is_read = FALSE, created_at = now()
                  WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
            );
            sqlx::query(&sql).bind(id).bind(message).fetch_one(&self.pool).await?
        } else {
            let sql = format!(
                r"INSERT INTO notifications (user_id, type, message, related_id) VALUES ($1, $2, $3, $4)
                  RETURNING {NOTIFICATION_COLUMNS}"
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(kind)
                .bind(message)
                .bind(related_id)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(notification_from_row(&row))
    }

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>, StoreError> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(notification_from_row))
    }

    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn mark_notification_read(&self, id: NotificationId, user_id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- game sessions ------------------------------------------------------

    async fn create_session(
        &self,
        host_user_id: UserId,
        game_type: &str,
        max_players: i32,
        invitees: &[UserId],
    ) -> Result<GameSession, StoreError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r"INSERT INTO game_sessions (host_user_id, game_type, status, max_players)
              VALUES ($1, $2, 'waiting', $3)
              RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(host_user_id)
            .bind(game_type)
            .bind(max_players)
            .fetch_one(&mut *tx)
            .await?;
        let session = session_from_row(&row);

        sqlx::query(
            r"INSERT INTO game_participants (session_id, user_id, role, status, ready)
              VALUES ($1, $2, $3, 'ready', TRUE)",
        )
        .bind(session.id)
        .bind(host_user_id)
        .bind(ParticipantRole::Host.as_str())
        .execute(&mut *tx)
        .await?;

        for &user_id in invitees {
            sqlx::query(
                r"INSERT INTO game_participants (session_id, user_id, role, status, ready)
                  VALUES ($1, $2, $3, 'invited', FALSE)
                  ON CONFLICT (session_id, user_id) DO NOTHING",
            )
            .bind(session.id)
            .bind(user_id)
            .bind(ParticipantRole::Player.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(session)
    }

    async fn session(&self, id: SessionId) -> Result<Option<GameSession>, StoreError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn participants(&self, session_id: SessionId) -> Result<Vec<GameParticipant>, StoreError> {
        let rows = sqlx::query(
            r"SELECT session_id, user_id, role, status, ready,
                (EXTRACT(EPOCH FROM joined_at) * 1000)::BIGINT AS joined_at
              FROM game_participants
              WHERE session_id = $1
              ORDER BY (role = 'host') DESC, joined_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(participant_from_row).collect())
    }

    async fn add_invitees(
        &self,
        session_id: SessionId,
        invitees: &[UserId],
        limit: usize,
    ) -> Result<Vec<UserId>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut added = Vec::new();
        for &user_id in invitees {
            if added.len() >= limit {
                break;
            }
            let result = sqlx::query(
                r"INSERT INTO game_participants (session_id, user_id, role, status, ready)
                  VALUES ($1, $2, $3, 'invited', FALSE)
                  ON CONFLICT (session_id, user_id) DO NOTHING",
            )
            .bind(session_id)
            .bind(user_id)
            .bind(ParticipantRole::Player.as_str())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() > 0 {
                added.push(user_id);
            }
        }
        if !added.is_empty() {
            sqlx::query("UPDATE game_sessions SET updated_at = now() WHERE id = $1")
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(added)
    }

    async fn update_participant(
        &self,
        session_id: SessionId,
        user_id: UserId,
        status: Option<ParticipantStatus>,
        ready: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"UPDATE game_participants SET status = COALESCE($3, status), ready = $4
              WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(status.map(ParticipantStatus::as_str))
        .bind(ready)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transition_session(
        &self,
        id: SessionId,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<bool, StoreError> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let result = sqlx::query(
            r"UPDATE game_sessions
              SET status = $3, updated_at = now(),
                  started_at = CASE WHEN $3 = 'in_progress' THEN now() ELSE started_at END
              WHERE id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(&from)
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cancel_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"UPDATE game_sessions SET status = 'cancelled', updated_at = now()
              WHERE id = $1 AND status NOT IN ('completed', 'cancelled')",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("UPDATE game_participants SET status = 'cancelled', ready = FALSE WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn active_session_ids(&self, user_id: UserId) -> Result<Vec<SessionId>, StoreError> {
        let ids = sqlx::query_scalar(
            r"SELECT DISTINCT s.id FROM game_sessions s
              JOIN game_participants p ON p.session_id = s.id
              WHERE p.user_id = $1 AND s.status IN ('waiting', 'ready', 'in_progress')
              ORDER BY s.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn moves(&self, session_id: SessionId) -> Result<Vec<GameMove>, StoreError> {
        let rows = sqlx::query(
            r"SELECT id, session_id, user_id, cell_row, cell_col, move_number
              FROM game_moves WHERE session_id = $1 ORDER BY move_number",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(move_from_row).collect())
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
        let mut tx = self.pool.begin().await?;

        // Row lock serializes moves on the session against completion.
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM game_sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;
        if status.as_deref() != Some(SessionStatus::InProgress.as_str()) {
            return Ok(MoveInsert::NotInProgress);
        }

        let result = sqlx::query(
            r"INSERT INTO game_moves (session_id, user_id, cell_row, cell_col, move_number)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING id, session_id, user_id, cell_row, cell_col, move_number",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(row)
        .bind(col)
        .bind(move_number)
        .fetch_one(&mut *tx)
        .await;
        let game_move = match result {
            Ok(row) => move_from_row(&row),
            Err(e) => {
                return match unique_violation(&e).as_deref() {
                    Some(MOVE_CELL_CONSTRAINT) => Ok(MoveInsert::CellOccupied),
                    Some(MOVE_NUMBER_CONSTRAINT) => Ok(MoveInsert::NumberTaken),
                    _ => Err(e.into()),
                };
            }
        };

        if let MoveEffect::Complete { winner } = effect {
            sqlx::query(
                r"UPDATE game_sessions
                  SET status = 'completed', winner_user_id = $2, completed_at = now(), updated_at = now()
                  WHERE id = $1 AND status = 'in_progress'",
            )
            .bind(session_id)
            .bind(winner)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(MoveInsert::Inserted(game_move))
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
