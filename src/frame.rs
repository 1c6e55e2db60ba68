//! Frame — the wire message exchanged with game devices.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket message is a flat JSON object carrying a `type`
//! discriminator. The router dispatches on `type` and reads the remaining
//! keys through the typed accessors below; handlers never touch raw JSON.
//!
//! DESIGN
//! ======
//! - Flat data: every key other than `type` lives in `data`.
//! - Older firmware speaks a `key:value-*-key:value` text pattern. Inbound
//!   parsing accepts both encodings; outbound frames are always JSON.
//! - Errors are frames too: `{type: "error", code, message, retryable}`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

/// Separator between pairs in the legacy text encoding.
const LEGACY_PAIR_SEPARATOR: &str = "-*-";

// =============================================================================
// FRAME TYPES
// =============================================================================

pub const TYPE_PING: &str = "ping";
pub const TYPE_PONG: &str = "pong";
pub const TYPE_INIT: &str = "init";
pub const TYPE_INIT_ACK: &str = "init_ack";
pub const TYPE_LOGIN: &str = "login";
pub const TYPE_LOGIN_SUCCESS: &str = "login_success";
pub const TYPE_VALIDATE_USERNAME: &str = "validate_username";
pub const TYPE_USERNAME_VALID: &str = "username_valid";
pub const TYPE_ERROR: &str = "error";
pub const TYPE_EVICTED: &str = "evicted";
pub const TYPE_USER_STATUS_UPDATE: &str = "user_status_update";
pub const TYPE_NOTIFICATION: &str = "notification";
pub const TYPE_GAME_ACTION: &str = "game_action";
pub const TYPE_GAME_EVENT: &str = "game_event";
pub const TYPE_GAME_RESPONSE: &str = "game_response";
pub const TYPE_CHAT_MESSAGE: &str = "chat_message";
pub const TYPE_CHAT_ERROR: &str = "chat_error";
pub const TYPE_MESSAGE_DELIVERED: &str = "message_delivered";
pub const TYPE_MESSAGE_READ: &str = "message_read";
pub const TYPE_READ_RECEIPT: &str = "read_receipt";
pub const TYPE_TYPING_START: &str = "typing_start";
pub const TYPE_TYPING_STOP: &str = "typing_stop";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// The universal message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub data: Data,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no type")]
    MissingType,
}

impl ErrorCode for FrameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_INVALID_JSON",
            Self::MissingType => "E_MISSING_TYPE",
        }
    }
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create an empty frame of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), data: Data::new() }
    }

    /// Create a structured `error` frame from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::error_as(TYPE_ERROR, err)
    }

    /// Create a structured error frame with a caller-chosen type
    /// (`chat_error`, `game_response`, ...).
    #[must_use]
    pub fn error_as(kind: &str, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::new(kind)
            .with_data(FRAME_CODE, err.error_code())
            .with_data(FRAME_MESSAGE, err.to_string())
            .with_data(FRAME_RETRYABLE, err.retryable())
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(self) -> Self {
        self.with_data("timestamp", now_ms())
    }
}

// =============================================================================
// PARSING
// =============================================================================

impl Frame {
    /// Parse an inbound text message, accepting JSON or the legacy pattern.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed JSON objects and `MissingType` when the
    /// legacy pattern carries no `type` pair.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            return Ok(serde_json::from_str(trimmed)?);
        }
        parse_legacy(trimmed)
    }

    /// Serialize to JSON text for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value fails to serialize.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn parse_legacy(text: &str) -> Result<Frame, FrameError> {
    let mut kind = None;
    let mut data = Data::new();
    for pair in text.split(LEGACY_PAIR_SEPARATOR) {
        // Split on the first colon only; values may contain colons.
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        if key == "type" {
            kind = Some(value.to_owned());
        } else {
            data.insert(key.to_owned(), serde_json::Value::String(value.to_owned()));
        }
    }
    let kind = kind.filter(|k| !k.is_empty()).ok_or(FrameError::MissingType)?;
    Ok(Frame { kind, data })
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    /// Integer field. Accepts JSON numbers and numeric strings (legacy encoding).
    #[must_use]
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        let value = self.data.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    /// Boolean field. Accepts JSON booleans and `true`/`false`/`1`/`0` strings.
    #[must_use]
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        let value = self.data.get(key)?;
        if let Some(b) = value.as_bool() {
            return Some(b);
        }
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    }

    /// Integer list field. Accepts a JSON array or a comma-separated string.
    /// Entries that are not integers are skipped.
    #[must_use]
    pub fn i64_list(&self, key: &str) -> Vec<i64> {
        match self.data.get(key) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
                .collect(),
            Some(serde_json::Value::String(s)) => s
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
