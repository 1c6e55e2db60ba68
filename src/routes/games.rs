//! Game session routes — the REST face of the session state machine.
//!
//! Every operation here has a `game_action` twin on the WebSocket; both
//! paths call the same service functions and emit the same events.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiResult};
use crate::services::game::{self, GameError};
use crate::state::AppState;
use crate::store::{SessionId, UserId};

const DEFAULT_MAX_PLAYERS: i32 = 4;

fn default_true() -> bool {
    true
}

fn default_max_players() -> i32 {
    DEFAULT_MAX_PLAYERS
}

#[derive(Deserialize)]
pub struct CreateBody {
    pub host_user_id: UserId,
    pub game_type: String,
    #[serde(default = "default_max_players")]
    pub max_players: i32,
    #[serde(default)]
    pub participant_ids: Vec<UserId>,
}

#[derive(Deserialize)]
pub struct InviteBody {
    pub host_user_id: UserId,
    pub participant_ids: Vec<UserId>,
}

#[derive(Deserialize)]
pub struct RespondBody {
    pub user_id: UserId,
    #[serde(default = "default_true")]
    pub accept: bool,
    #[serde(default = "default_true")]
    pub ready_on_accept: bool,
}

#[derive(Deserialize)]
pub struct ReadyBody {
    pub user_id: UserId,
    #[serde(default = "default_true")]
    pub ready: bool,
}

#[derive(Deserialize)]
pub struct UserBody {
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct MoveBody {
    pub user_id: UserId,
    pub row: i32,
    pub col: i32,
}

pub(crate) fn game_error_to_status(err: &GameError) -> StatusCode {
    match err {
        GameError::InvalidMaxPlayers(_)
        | GameError::CaroRequiresTwo
        | GameError::TooManyInvitees { .. }
        | GameError::SessionClosed(_)
        | GameError::SessionFull
        | GameError::CaroFull
        | GameError::NotInProgress
        | GameError::WrongPlayerCount(_)
        | GameError::OutOfBounds { .. }
        | GameError::CellOccupied
        | GameError::NotYourTurn
        | GameError::HostCannotRespond
        | GameError::MissingField(_)
        | GameError::UnknownAction(_) => StatusCode::BAD_REQUEST,
        GameError::NotHost | GameError::NotParticipant => StatusCode::FORBIDDEN,
        GameError::UserNotFound(_) | GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        GameError::Conflict => StatusCode::CONFLICT,
        GameError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self::new(game_error_to_status(&err), &err)
    }
}

fn ok(message: &str, session: impl serde::Serialize) -> ApiResult {
    Ok(Json(json!({ "success": true, "message": message, "session": session })))
}

/// `POST /api/games/create`
pub async fn create(State(state): State<AppState>, Json(body): Json<CreateBody>) -> ApiResult {
    let view = game::create_session(
        &state,
        body.host_user_id,
        &body.game_type,
        body.max_players,
        &body.participant_ids,
    )
    .await?;
    ok("Game session created", view)
}

/// `POST /api/games/:session_id/invite`
pub async fn invite(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<InviteBody>,
) -> ApiResult {
    let (view, invited) = game::invite(&state, session_id, body.host_user_id, &body.participant_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Invited {} player(s)", invited.len()),
        "invited": invited,
        "session": view,
    })))
}

/// `POST /api/games/:session_id/respond`
pub async fn respond(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<RespondBody>,
) -> ApiResult {
    let view = game::respond(&state, session_id, body.user_id, body.accept, body.ready_on_accept).await?;
    ok(if body.accept { "Invite accepted" } else { "Invite declined" }, view)
}

/// `POST /api/games/:session_id/ready`
pub async fn ready(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<ReadyBody>,
) -> ApiResult {
    let view = game::set_ready(&state, session_id, body.user_id, body.ready).await?;
    ok("Ready state updated", view)
}

/// `POST /api/games/:session_id/leave`
pub async fn leave(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<UserBody>,
) -> ApiResult {
    let view = game::leave(&state, session_id, body.user_id).await?;
    ok("Left session", view)
}

/// `POST /api/games/:session_id/move`
pub async fn submit_move(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<MoveBody>,
) -> ApiResult {
    let outcome = game::submit_move(&state, session_id, body.user_id, body.row, body.col).await?;
    Ok(Json(json!({ "success": true, "message": "Move accepted", "move": outcome })))
}

/// `GET /api/games/:session_id`
pub async fn get_session(State(state): State<AppState>, Path(session_id): Path<SessionId>) -> ApiResult {
    let view = game::get_session(&state, session_id).await?;
    ok("Session found", view)
}

/// `GET /api/games/:session_id/state`
pub async fn get_state(State(state): State<AppState>, Path(session_id): Path<SessionId>) -> ApiResult {
    let view = game::get_state(&state, session_id).await?;
    Ok(Json(json!({ "success": true, "state": view })))
}

/// `GET /api/games/active/:user_id` — resync after reconnect.
pub async fn active(State(state): State<AppState>, Path(user_id): Path<UserId>) -> ApiResult {
    let sessions = game::active_sessions(&state, user_id).await?;
    Ok(Json(json!({ "success": true, "sessions": sessions })))
}

#[cfg(test)]
#[path = "games_test.rs"]
mod tests;
