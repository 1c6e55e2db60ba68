//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Devices hold one WebSocket at `/ws` for everything live (presence, chat,
//! game events). The JSON REST surface under `/api` covers account, friend
//! graph, notification and game operations for tooling and for firmware
//! that prefers plain HTTP for one-shot requests.

pub mod auth;
pub mod friends;
pub mod games;
pub mod sessions;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::frame::ErrorCode;
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body shared by every REST handler:
/// `{success: false, code, message, retryable}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Self {
        if status.is_server_error() {
            tracing::error!(code = err.error_code(), error = %err, "api: request failed");
        }
        Self { status, code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "code": self.code,
            "message": self.message,
            "retryable": self.retryable,
        });
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult = Result<Json<serde_json::Value>, ApiError>;

// =============================================================================
// ROUTER
// =============================================================================

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .route("/api/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .route("/api/users/{username}", get(auth::user_info))
        .route("/api/friends/{user_id}/list", get(friends::list_friends))
        .route("/api/friends/{user_id}/{friend_id}", delete(friends::remove_friend))
        .route("/api/friend-requests", post(friends::send_request))
        .route("/api/friend-requests/accept", post(friends::accept_request))
        .route("/api/friend-requests/reject", post(friends::reject_request))
        .route("/api/friend-requests/cancel", post(friends::cancel_request))
        .route("/api/notifications/{id}", get(friends::list_notifications))
        .route("/api/notifications/{id}/read", post(friends::mark_notification_read))
        .route("/api/games/create", post(games::create))
        .route("/api/games/active/{user_id}", get(games::active))
        .route("/api/games/{session_id}", get(games::get_session))
        .route("/api/games/{session_id}/state", get(games::get_state))
        .route("/api/games/{session_id}/invite", post(games::invite))
        .route("/api/games/{session_id}/respond", post(games::respond))
        .route("/api/games/{session_id}/ready", post(games::ready))
        .route("/api/games/{session_id}/leave", post(games::leave))
        .route("/api/games/{session_id}/move", post(games::submit_move))
        .route("/api/sessions", get(sessions::list))
        .route("/api/sessions/count", get(sessions::count))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
