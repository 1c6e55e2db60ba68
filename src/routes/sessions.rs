//! Live connection introspection.

use axum::extract::State;
use axum::response::Json;
use serde_json::json;

use super::ApiResult;
use crate::state::AppState;

/// `GET /api/sessions` — users currently bound to a connection.
pub async fn list(State(state): State<AppState>) -> ApiResult {
    let mut sessions = Vec::new();
    for user_id in state.registry.online_users() {
        let username = match state.directory.user_by_id(user_id).await {
            Ok(user) => user.map(|u| u.username),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "sessions: user lookup failed");
                None
            }
        };
        sessions.push(json!({ "user_id": user_id, "username": username }));
    }
    Ok(Json(json!({ "sessions": sessions })))
}

/// `GET /api/sessions/count` — open connections, bound or not.
pub async fn count(State(state): State<AppState>) -> ApiResult {
    Ok(Json(json!({
        "count": state.registry.connection_count(),
        "online": state.registry.online_users().len(),
    })))
}
