//! Credential checks — username + PIN.
//!
//! PINs are never stored or logged in plain text; the directory keeps a
//! lowercase SHA-256 hex digest and login compares digests.

use sha2::{Digest, Sha256};

use crate::frame::ErrorCode;
use crate::state::AppState;
use crate::store::{StoreError, User, UserId};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username and PIN required")]
    MissingCredentials,
    #[error("Username required")]
    MissingUsername,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("User not found")]
    UnknownUserId(UserId),
    #[error("Username '{0}' already exists")]
    UsernameTaken(String),
    #[error("user directory unavailable: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(name) => Self::UsernameTaken(name),
            other => Self::Store(other),
        }
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredentials | Self::MissingUsername => "E_MISSING_CREDENTIALS",
            Self::AccountNotFound | Self::UnknownUserId(_) => "E_USER_NOT_FOUND",
            Self::InvalidPin => "E_INVALID_PIN",
            Self::UsernameTaken(_) => "E_DUPLICATE_USERNAME",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

impl AuthError {
    /// Whether the account exists even though the login failed.
    #[must_use]
    pub fn account_exists(&self) -> Option<bool> {
        match self {
            Self::InvalidPin => Some(true),
            Self::AccountNotFound => Some(false),
            _ => None,
        }
    }
}

/// Lowercase hex SHA-256 of the PIN.
#[must_use]
pub fn hash_pin(pin: &str) -> String {
    format!("{:x}", Sha256::digest(pin.as_bytes()))
}

/// Look up `username` and compare the PIN digest.
///
/// # Errors
///
/// Missing fields, unknown account, wrong PIN, or directory failure.
pub async fn verify_credentials(state: &AppState, username: &str, pin: &str) -> Result<User, AuthError> {
    if username.is_empty() || pin.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    let Some(user) = state.directory.user_by_username(username).await? else {
        tracing::warn!(username, "auth: unknown username");
        return Err(AuthError::AccountNotFound);
    };
    if user.pin_hash != hash_pin(pin) {
        tracing::warn!(username, "auth: invalid pin");
        return Err(AuthError::InvalidPin);
    }
    tracing::info!(user_id = user.id, username, "auth: login ok");
    Ok(user)
}

/// Create an account with a hashed PIN.
///
/// # Errors
///
/// Missing fields, a taken username, or directory failure.
pub async fn register(state: &AppState, username: &str, pin: &str) -> Result<User, AuthError> {
    let username = username.trim();
    if username.is_empty() || pin.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if state.directory.user_by_username(username).await?.is_some() {
        return Err(AuthError::UsernameTaken(username.to_owned()));
    }
    let user = state.directory.create_user(username, &hash_pin(pin)).await?;
    tracing::info!(user_id = user.id, username, "auth: account created");
    Ok(user)
}

/// Resolve a username, for the pre-login existence check and profile reads.
///
/// # Errors
///
/// `MissingUsername`, `AccountNotFound`, or directory failure.
pub async fn lookup_username(state: &AppState, username: &str) -> Result<User, AuthError> {
    if username.is_empty() {
        return Err(AuthError::MissingUsername);
    }
    state
        .directory
        .user_by_username(username)
        .await?
        .ok_or(AuthError::AccountNotFound)
}

/// Resolve the user an `init` frame claims to be.
///
/// # Errors
///
/// `UnknownUserId` or directory failure.
pub async fn lookup_user_id(state: &AppState, user_id: UserId) -> Result<User, AuthError> {
    state
        .directory
        .user_by_id(user_id)
        .await?
        .ok_or(AuthError::UnknownUserId(user_id))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
