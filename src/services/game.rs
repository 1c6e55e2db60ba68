//! Game sessions — lobby lifecycle and caro moves.
//!
//! LIFECYCLE
//! =========
//! `waiting -> ready -> in_progress -> {completed, cancelled}`
//!
//! - create: host plus friend invitees; starts `waiting`.
//! - invite / respond: only while `waiting` or `ready`. Every response
//!   recomputes the session status over all participants.
//! - set_ready: once every participant is ready the game starts.
//! - leave: the host cancels the session; anyone else just leaves it.
//! - move: turn order alternates starting with the host. The board is
//!   rebuilt from the move history and checked for five in a row.
//!
//! CONCURRENCY
//! ===========
//! Status changes are conditional updates in the store. When one matches no
//! rows another actor got there first, and the caller sees a retryable
//! `Conflict`. Events are pushed through fanout after the store call
//! returns; delivery is best effort.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;

use super::caro::{self, Board};
use super::fanout;
use crate::frame::{ErrorCode, Frame};
use crate::state::AppState;
use crate::store::{
    GameMove, GameParticipant, GameSession, MoveEffect, MoveInsert, ParticipantRole, ParticipantStatus, SessionId,
    SessionStatus, StoreError, UserId,
};

pub const GAME_CARO: &str = "caro";
pub const MIN_PLAYERS: i32 = 2;
pub const MAX_PLAYERS: i32 = 8;
const CARO_PLAYERS: i32 = 2;

pub const EVENT_INVITE: &str = "invite";
pub const EVENT_RESPOND: &str = "respond";
pub const EVENT_READY: &str = "ready";
pub const EVENT_CANCELLED: &str = "cancelled";
pub const EVENT_LEFT: &str = "left";
pub const EVENT_MOVE: &str = "move";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("max_players must be between 2 and 8")]
    InvalidMaxPlayers(i32),
    #[error("Caro game requires exactly 2 players")]
    CaroRequiresTwo,
    #[error("Too many participants (max {max} invitees)")]
    TooManyInvitees { max: i32 },
    #[error("User not found")]
    UserNotFound(UserId),
    #[error("Session not found")]
    SessionNotFound(SessionId),
    #[error("Only host can invite players")]
    NotHost,
    #[error("User is not a participant in this session")]
    NotParticipant,
    #[error("Host cannot respond to their own session")]
    HostCannotRespond,
    #[error("Session is {0}")]
    SessionClosed(&'static str),
    #[error("Session is full")]
    SessionFull,
    #[error("Caro game only supports 2 players (host + 1 participant)")]
    CaroFull,
    #[error("Game is not in progress")]
    NotInProgress,
    #[error("Game requires exactly 2 participants")]
    WrongPlayerCount(usize),
    #[error("Cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: i32, col: i32 },
    #[error("Cell already occupied")]
    CellOccupied,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Session changed concurrently, retry")]
    Conflict,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Unknown game action: {0}")]
    UnknownAction(String),
    #[error("game store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for GameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidMaxPlayers(_) => "E_INVALID_MAX_PLAYERS",
            Self::CaroRequiresTwo => "E_CARO_REQUIRES_TWO",
            Self::TooManyInvitees { .. } => "E_TOO_MANY_INVITEES",
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::SessionNotFound(_) => "E_SESSION_NOT_FOUND",
            Self::NotHost => "E_NOT_HOST",
            Self::NotParticipant => "E_NOT_PARTICIPANT",
            Self::HostCannotRespond => "E_HOST_CANNOT_RESPOND",
            Self::SessionClosed(_) => "E_SESSION_CLOSED",
            Self::SessionFull | Self::CaroFull => "E_SESSION_FULL",
            Self::NotInProgress => "E_NOT_IN_PROGRESS",
            Self::WrongPlayerCount(_) => "E_PLAYER_COUNT",
            Self::OutOfBounds { .. } => "E_OUT_OF_BOUNDS",
            Self::CellOccupied => "E_CELL_OCCUPIED",
            Self::NotYourTurn => "E_NOT_YOUR_TURN",
            Self::Conflict => "E_CONFLICT",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::UnknownAction(_) => "E_UNKNOWN_ACTION",
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

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub user_id: UserId,
    pub nickname: String,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: GameSession,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub user_id: UserId,
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStateView {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub board: Vec<Vec<u8>>,
    pub current_turn: Option<UserId>,
    pub move_count: usize,
    pub host: Option<PlayerView>,
    pub guest: Option<PlayerView>,
    pub winner_user_id: Option<UserId>,
    pub last_move: Option<GameMove>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub move_id: i64,
    pub move_number: i32,
    pub row: i32,
    pub col: i32,
    /// `in_progress`, `completed`, or `draw`.
    pub game_status: &'static str,
    pub winner_id: Option<UserId>,
    pub current_turn: UserId,
}

// =============================================================================
// HELPERS
// =============================================================================

fn is_caro(game_type: &str) -> bool {
    game_type.eq_ignore_ascii_case(GAME_CARO)
}

/// Order-preserving dedupe that drops `host`.
fn normalize_invitees(host: UserId, invitees: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::new();
    invitees
        .iter()
        .copied()
        .filter(|&id| id != host && seen.insert(id))
        .collect()
}

/// Keep invitees that exist and are mutual friends of the host.
async fn friend_invitees(state: &AppState, host: UserId, invitees: Vec<UserId>) -> Result<Vec<UserId>, GameError> {
    let mut valid = Vec::with_capacity(invitees.len());
    for id in invitees {
        if state.directory.user_by_id(id).await?.is_none() {
            tracing::debug!(host, invitee = id, "game: skipping unknown invitee");
            continue;
        }
        if !state.directory.are_friends(host, id).await? {
            tracing::debug!(host, invitee = id, "game: skipping non-friend invitee");
            continue;
        }
        valid.push(id);
    }
    Ok(valid)
}

async fn load_session(state: &AppState, session_id: SessionId) -> Result<GameSession, GameError> {
    state
        .store
        .session(session_id)
        .await?
        .ok_or(GameError::SessionNotFound(session_id))
}

async fn display_name(state: &AppState, user_id: UserId) -> Result<String, GameError> {
    Ok(state
        .directory
        .user_by_id(user_id)
        .await?
        .map_or_else(|| user_id.to_string(), |u| u.display_name().to_owned()))
}

async fn view(state: &AppState, session: GameSession) -> Result<SessionView, GameError> {
    let rows = state.store.participants(session.id).await?;
    let mut participants = Vec::with_capacity(rows.len());
    for p in rows {
        participants.push(ParticipantView {
            nickname: display_name(state, p.user_id).await?,
            user_id: p.user_id,
            role: p.role,
            status: p.status,
            ready: p.ready,
        });
    }
    Ok(SessionView { session, participants })
}

async fn view_by_id(state: &AppState, session_id: SessionId) -> Result<SessionView, GameError> {
    let session = load_session(state, session_id).await?;
    view(state, session).await
}

fn participant_ids(participants: &[GameParticipant]) -> impl Iterator<Item = UserId> + '_ {
    participants.iter().map(|p| p.user_id)
}

/// Lobby status implied by the participants' statuses.
fn recompute_status(participants: &[GameParticipant]) -> SessionStatus {
    if participants.iter().any(|p| p.status == ParticipantStatus::Declined) {
        SessionStatus::Waiting
    } else if participants.iter().all(|p| p.ready) {
        SessionStatus::InProgress
    } else if participants.iter().all(|p| p.status.is_accepted()) {
        SessionStatus::Ready
    } else {
        SessionStatus::Waiting
    }
}

async fn transition(state: &AppState, session: &GameSession, to: SessionStatus) -> Result<(), GameError> {
    if state.store.transition_session(session.id, &SessionStatus::OPEN, to).await? {
        Ok(())
    } else {
        tracing::warn!(session_id = session.id, to = to.as_str(), "game: conditional transition matched no rows");
        Err(GameError::Conflict)
    }
}

fn require_open(session: &GameSession) -> Result<(), GameError> {
    if session.status.is_open() {
        Ok(())
    } else {
        Err(GameError::SessionClosed(session.status.as_str()))
    }
}

// =============================================================================
// LOBBY
// =============================================================================

/// Create a session hosted by `host` and invite the valid subset of
/// `invitees`.
///
/// # Errors
///
/// Player-count validation, unknown host, or store failure.
pub async fn create_session(
    state: &AppState,
    host: UserId,
    game_type: &str,
    max_players: i32,
    invitees: &[UserId],
) -> Result<SessionView, GameError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
        return Err(GameError::InvalidMaxPlayers(max_players));
    }
    if is_caro(game_type) && max_players != CARO_PLAYERS {
        return Err(GameError::CaroRequiresTwo);
    }
    let invitees = normalize_invitees(host, invitees);
    let max_invitees = max_players - 1;
    if invitees.len() > usize::try_from(max_invitees).unwrap_or(0) {
        return Err(GameError::TooManyInvitees { max: max_invitees });
    }
    let host_user = state.directory.user_by_id(host).await?.ok_or(GameError::UserNotFound(host))?;

    let invited = friend_invitees(state, host, invitees).await?;
    let session = state.store.create_session(host, game_type, max_players, &invited).await?;
    tracing::info!(session_id = session.id, host, invited = invited.len(), "game: session created");

    let event = fanout::game_event(EVENT_INVITE, session.id)
        .with_data("game_type", session.game_type.as_str())
        .with_data("host_user_id", host)
        .with_data("host_nickname", host_user.display_name())
        .with_data("max_players", max_players)
        .with_data("status", session.status.as_str());
    fanout::deliver(&state.registry, invited, &event);

    view(state, session).await
}

/// Invite more players into an open session. Returns the users actually
/// invited alongside the refreshed session.
///
/// # Errors
///
/// Non-host caller, closed or full session, or store failure.
pub async fn invite(
    state: &AppState,
    session_id: SessionId,
    host: UserId,
    invitees: &[UserId],
) -> Result<(SessionView, Vec<UserId>), GameError> {
    let session = load_session(state, session_id).await?;
    if session.host_user_id != host {
        return Err(GameError::NotHost);
    }
    require_open(&session)?;

    let current = state.store.participants(session_id).await?.len();
    let current = i32::try_from(current).unwrap_or(i32::MAX);
    let capacity = if is_caro(&session.game_type) {
        if current >= CARO_PLAYERS {
            return Err(GameError::CaroFull);
        }
        CARO_PLAYERS.min(session.max_players) - current
    } else {
        session.max_players - current
    };
    if capacity <= 0 {
        return Err(GameError::SessionFull);
    }

    let candidates = friend_invitees(state, host, normalize_invitees(host, invitees)).await?;
    let added = state
        .store
        .add_invitees(session_id, &candidates, usize::try_from(capacity).unwrap_or(0))
        .await?;

    // New invitees have not accepted yet, so a ready lobby is waiting again.
    if !added.is_empty() && session.status == SessionStatus::Ready {
        transition(state, &session, SessionStatus::Waiting).await?;
    }

    let refreshed = view_by_id(state, session_id).await?;
    let event = fanout::game_event(EVENT_INVITE, session_id)
        .with_data("game_type", session.game_type.as_str())
        .with_data("host_user_id", host)
        .with_data("host_nickname", display_name(state, host).await?)
        .with_data("max_players", session.max_players)
        .with_data("status", refreshed.session.status.as_str());
    fanout::deliver(&state.registry, added.iter().copied(), &event);

    tracing::info!(session_id, host, invited = added.len(), "game: players invited");
    Ok((refreshed, added))
}

/// Accept or decline an invite, then recompute the session status.
///
/// # Errors
///
/// Unknown session, non-participant or host caller, closed session, or a
/// concurrent status change (`Conflict`).
pub async fn respond(
    state: &AppState,
    session_id: SessionId,
    user_id: UserId,
    accept: bool,
    ready_on_accept: bool,
) -> Result<SessionView, GameError> {
    let session = load_session(state, session_id).await?;
    if session.host_user_id == user_id {
        return Err(GameError::HostCannotRespond);
    }
    require_open(&session)?;

    let status = if accept { ParticipantStatus::Accepted } else { ParticipantStatus::Declined };
    let ready = accept && ready_on_accept;
    let status = if ready { ParticipantStatus::Ready } else { status };
    if !state
        .store
        .update_participant(session_id, user_id, Some(status), ready)
        .await?
    {
        return Err(GameError::NotParticipant);
    }

    let participants = state.store.participants(session_id).await?;
    let next = recompute_status(&participants);
    transition(state, &session, next).await?;
    tracing::info!(session_id, user_id, accept, status = next.as_str(), "game: invite answered");

    let event = fanout::game_event(EVENT_RESPOND, session_id)
        .with_data("game_type", session.game_type.as_str())
        .with_data("user_id", user_id)
        .with_data("user_nickname", display_name(state, user_id).await?)
        .with_data("accepted", accept)
        .with_data("ready", ready)
        .with_data("status", next.as_str());
    fanout::deliver(
        &state.registry,
        participant_ids(&participants).chain([session.host_user_id]),
        &event,
    );

    view_by_id(state, session_id).await
}

/// Set a participant's ready flag; start the game once everyone is ready.
///
/// # Errors
///
/// Unknown session, non-participant, closed session, or `Conflict`.
pub async fn set_ready(
    state: &AppState,
    session_id: SessionId,
    user_id: UserId,
    ready: bool,
) -> Result<SessionView, GameError> {
    let session = load_session(state, session_id).await?;
    require_open(&session)?;

    let before = state.store.participants(session_id).await?;
    let Some(me) = before.iter().find(|p| p.user_id == user_id) else {
        return Err(GameError::NotParticipant);
    };
    let status = match (ready, me.status) {
        (true, _) => Some(ParticipantStatus::Ready),
        (false, ParticipantStatus::Ready) => Some(ParticipantStatus::Accepted),
        (false, _) => None,
    };
    if !state.store.update_participant(session_id, user_id, status, ready).await? {
        return Err(GameError::NotParticipant);
    }

    let participants = state.store.participants(session_id).await?;
    let next = if participants.iter().all(|p| p.ready) {
        transition(state, &session, SessionStatus::InProgress).await?;
        SessionStatus::InProgress
    } else {
        session.status
    };
    tracing::info!(session_id, user_id, ready, status = next.as_str(), "game: ready changed");

    let event = fanout::game_event(EVENT_READY, session_id)
        .with_data("game_type", session.game_type.as_str())
        .with_data("user_id", user_id)
        .with_data("ready", ready)
        .with_data("status", next.as_str());
    fanout::deliver(&state.registry, participant_ids(&participants), &event);

    view_by_id(state, session_id).await
}

/// Leave a session. The host leaving cancels it for everyone; anyone else
/// is marked `left` and the session status is not advanced.
///
/// # Errors
///
/// Unknown session, non-participant, already-terminal session, or `Conflict`.
pub async fn leave(state: &AppState, session_id: SessionId, user_id: UserId) -> Result<SessionView, GameError> {
    let session = load_session(state, session_id).await?;
    if session.status.is_terminal() {
        return Err(GameError::SessionClosed(session.status.as_str()));
    }
    let participants = state.store.participants(session_id).await?;
    if !participants.iter().any(|p| p.user_id == user_id) {
        return Err(GameError::NotParticipant);
    }

    let event = if user_id == session.host_user_id {
        if !state.store.cancel_session(session_id).await? {
            return Err(GameError::Conflict);
        }
        tracing::info!(session_id, user_id, "game: host left, session cancelled");
        fanout::game_event(EVENT_CANCELLED, session_id).with_data("status", SessionStatus::Cancelled.as_str())
    } else {
        state
            .store
            .update_participant(session_id, user_id, Some(ParticipantStatus::Left), false)
            .await?;
        tracing::info!(session_id, user_id, "game: participant left");
        fanout::game_event(EVENT_LEFT, session_id).with_data("status", session.status.as_str())
    };
    let event = event
        .with_data("game_type", session.game_type.as_str())
        .with_data("user_id", user_id);
    fanout::deliver(&state.registry, participant_ids(&participants), &event);

    view_by_id(state, session_id).await
}

// =============================================================================
// MOVES
// =============================================================================

/// Place a stone for `user_id` at `(row, col)`.
///
/// # Errors
///
/// Session not in progress, non-participant, wrong player count, out of
/// bounds, occupied cell, out of turn, or a concurrent move (`Conflict`).
pub async fn submit_move(
    state: &AppState,
    session_id: SessionId,
    user_id: UserId,
    row: i32,
    col: i32,
) -> Result<MoveOutcome, GameError> {
    let session = load_session(state, session_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(GameError::NotInProgress);
    }
    let participants = state.store.participants(session_id).await?;
    // A player who left keeps their row but no longer plays.
    if !participants
        .iter()
        .any(|p| p.user_id == user_id && p.status != ParticipantStatus::Left)
    {
        return Err(GameError::NotParticipant);
    }
    let [first, second] = participants.as_slice() else {
        return Err(GameError::WrongPlayerCount(participants.len()));
    };
    let host = session.host_user_id;
    let guest = if first.user_id == host { second.user_id } else { first.user_id };

    if !caro::in_bounds(row, col) {
        return Err(GameError::OutOfBounds { row, col });
    }

    let moves = state.store.moves(session_id).await?;
    let mut board = Board::from_moves(&moves);
    if board.owner(row, col).is_some() {
        return Err(GameError::CellOccupied);
    }
    let expected = if moves.len() % 2 == 0 { host } else { guest };
    if user_id != expected {
        return Err(GameError::NotYourTurn);
    }

    let move_number = i32::try_from(moves.len() + 1).unwrap_or(i32::MAX);
    board.place(row, col, user_id);
    let (game_status, winner_id) = if board.wins_at(row, col, user_id) {
        ("completed", Some(user_id))
    } else if board.is_full() {
        ("draw", None)
    } else {
        (SessionStatus::InProgress.as_str(), None)
    };
    let effect = if game_status == SessionStatus::InProgress.as_str() {
        MoveEffect::Continue
    } else {
        MoveEffect::Complete { winner: winner_id }
    };

    let game_move = match state
        .store
        .insert_move(session_id, user_id, row, col, move_number, effect)
        .await?
    {
        MoveInsert::Inserted(m) => m,
        MoveInsert::CellOccupied => return Err(GameError::CellOccupied),
        MoveInsert::NumberTaken | MoveInsert::NotInProgress => return Err(GameError::Conflict),
    };
    if let MoveEffect::Complete { winner } = effect {
        tracing::info!(session_id, ?winner, "game: completed");
    }

    let current_turn = if user_id == host { guest } else { host };
    let outcome = MoveOutcome {
        move_id: game_move.id,
        move_number: game_move.move_number,
        row,
        col,
        game_status,
        winner_id,
        current_turn,
    };

    let event = fanout::game_event(EVENT_MOVE, session_id)
        .with_data("user_id", user_id)
        .with_data("row", row)
        .with_data("col", col)
        .with_data("move_number", game_move.move_number)
        .with_data("game_status", game_status)
        .with_data("winner_id", json!(winner_id))
        .with_data("current_turn", current_turn);
    fanout::deliver(&state.registry, [host, guest], &event);

    Ok(outcome)
}

// =============================================================================
// QUERIES
// =============================================================================

/// Session metadata and participants.
///
/// # Errors
///
/// Unknown session or store failure.
pub async fn get_session(state: &AppState, session_id: SessionId) -> Result<SessionView, GameError> {
    view_by_id(state, session_id).await
}

/// Board snapshot, whose turn it is, and both players.
///
/// `current_turn` is reported even after the game ended.
///
/// # Errors
///
/// Unknown session or store failure.
pub async fn get_state(state: &AppState, session_id: SessionId) -> Result<GameStateView, GameError> {
    let session = load_session(state, session_id).await?;
    let participants = state.store.participants(session_id).await?;
    let moves = state.store.moves(session_id).await?;
    let board = Board::from_moves(&moves);

    let host_id = session.host_user_id;
    let guest_id = participants.iter().map(|p| p.user_id).find(|&id| id != host_id);

    let host = Some(PlayerView { user_id: host_id, nickname: display_name(state, host_id).await? });
    let guest = match guest_id {
        Some(id) => Some(PlayerView { user_id: id, nickname: display_name(state, id).await? }),
        None => None,
    };
    let current_turn = if moves.len() % 2 == 0 { Some(host_id) } else { guest_id };

    Ok(GameStateView {
        session_id,
        status: session.status,
        board: board.matrix(host_id),
        current_turn,
        move_count: moves.len(),
        host,
        guest,
        winner_user_id: session.winner_user_id,
        last_move: moves.last().cloned(),
    })
}

/// Non-terminal sessions the user participates in, newest first.
///
/// # Errors
///
/// Store failure.
pub async fn active_sessions(state: &AppState, user_id: UserId) -> Result<Vec<SessionView>, GameError> {
    let ids = state.store.active_session_ids(user_id).await?;
    let mut views = Vec::with_capacity(ids.len());
    for id in ids {
        views.push(view_by_id(state, id).await?);
    }
    Ok(views)
}

// =============================================================================
// WIRE DISPATCH
// =============================================================================

fn required_i64(req: &Frame, key: &'static str) -> Result<i64, GameError> {
    req.i64_field(key).ok_or(GameError::MissingField(key))
}

fn required_i32(req: &Frame, key: &'static str) -> Result<i32, GameError> {
    let value = required_i64(req, key)?;
    // Anything outside i32 is certainly off the board.
    Ok(i32::try_from(value).unwrap_or(i32::MAX))
}

/// Run a `game_action` frame for `user_id` and build the `game_response`
/// payload. The acting user always comes from the connection binding,
/// never from the frame.
///
/// # Errors
///
/// Any `GameError` raised by the action, or `UnknownAction`.
pub async fn dispatch_action(state: &AppState, user_id: UserId, req: &Frame) -> Result<serde_json::Value, GameError> {
    let action = req.str_field("action").unwrap_or_default();
    let value = match action {
        "create" => {
            let game_type = req.str_field("game_type").unwrap_or(GAME_CARO);
            let max_players = req
                .i64_field("max_players")
                .map_or(CARO_PLAYERS, |n| i32::try_from(n).unwrap_or(i32::MAX));
            let invitees = req.i64_list("participant_ids");
            json!(create_session(state, user_id, game_type, max_players, &invitees).await?)
        }
        "invite" => {
            let session_id = required_i64(req, "session_id")?;
            let (view, invited) = invite(state, session_id, user_id, &req.i64_list("participant_ids")).await?;
            json!({ "session": view, "invited": invited })
        }
        "respond" => {
            let session_id = required_i64(req, "session_id")?;
            let accept = req.bool_field("accept").unwrap_or(true);
            let ready_on_accept = req.bool_field("ready_on_accept").unwrap_or(true);
            json!(respond(state, session_id, user_id, accept, ready_on_accept).await?)
        }
        "ready" => {
            let session_id = required_i64(req, "session_id")?;
            let ready = req.bool_field("ready").unwrap_or(true);
            json!(set_ready(state, session_id, user_id, ready).await?)
        }
        "leave" => json!(leave(state, required_i64(req, "session_id")?, user_id).await?),
        "move" => {
            let session_id = required_i64(req, "session_id")?;
            let row = required_i32(req, "row")?;
            let col = required_i32(req, "col")?;
            json!(submit_move(state, session_id, user_id, row, col).await?)
        }
        "get" => json!(get_session(state, required_i64(req, "session_id")?).await?),
        "state" => json!(get_state(state, required_i64(req, "session_id")?).await?),
        "active" => json!(active_sessions(state, user_id).await?),
        other => return Err(GameError::UnknownAction(other.to_owned())),
    };
    Ok(value)
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
