//! Account routes — login, registration, user lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiResult};
use crate::frame::ErrorCode;
use crate::services::auth::{self, AuthError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub pin: String,
}

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingCredentials | AuthError::MissingUsername => StatusCode::BAD_REQUEST,
        AuthError::AccountNotFound | AuthError::UnknownUserId(_) => StatusCode::NOT_FOUND,
        AuthError::InvalidPin => StatusCode::UNAUTHORIZED,
        AuthError::UsernameTaken(_) => StatusCode::CONFLICT,
        AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(auth_error_to_status(&err), &err)
    }
}

/// `POST /api/login` — verify username + PIN.
///
/// Failed logins answer 401 and say whether the account exists, so the
/// device can offer registration instead of a PIN retry.
pub async fn login(State(state): State<AppState>, Json(body): Json<CredentialsBody>) -> Response {
    match auth::verify_credentials(&state, &body.username, &body.pin).await {
        Ok(user) => Json(json!({
            "success": true,
            "message": format!("Login successful for {}", user.username),
            "user_id": user.id,
            "username": user.username,
            "nickname": user.display_name(),
            "account_exists": true,
        }))
        .into_response(),
        Err(err) => match err.account_exists() {
            Some(exists) => {
                let body = json!({
                    "success": false,
                    "code": err.error_code(),
                    "message": err.to_string(),
                    "retryable": false,
                    "account_exists": exists,
                });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            None => ApiError::from(err).into_response(),
        },
    }
}

/// `POST /api/register` — create an account.
pub async fn register(State(state): State<AppState>, Json(body): Json<CredentialsBody>) -> ApiResult {
    let user = auth::register(&state, &body.username, &body.pin).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Account created successfully for {}", user.username),
        "user_id": user.id,
        "username": user.username,
    })))
}

/// `GET /api/users/:username` — public profile plus live presence.
pub async fn user_info(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult {
    let user = auth::lookup_username(&state, &username).await?;
    Ok(Json(json!({
        "success": true,
        "online": state.registry.is_online(user.id),
        "user": user,
    })))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
