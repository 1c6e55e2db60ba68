//! Server configuration parsed from environment variables.
//!
//! Every knob has a default so the server boots with no environment at all;
//! without `DATABASE_URL` it falls back to the in-memory store.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CHAT_RATE_LIMIT: usize = 10;
pub const DEFAULT_CHAT_RATE_WINDOW_MS: u64 = 1000;
pub const DEFAULT_CHAT_MAX_LEN: usize = 500;
pub const DEFAULT_TYPING_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_MAX_MISSED: u32 = 2;
pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub chat: ChatConfig,
    pub heartbeat: HeartbeatConfig,
    /// Outbound frame buffer per connection.
    pub ws_channel_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub max_len: usize,
    pub typing_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    /// Consecutive silent intervals tolerated before the connection is closed.
    pub max_missed: u32,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 8080
    /// - `DATABASE_URL`: in-memory store when absent or empty
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `CHAT_RATE_LIMIT` / `CHAT_RATE_WINDOW_MS`: default 10 per 1000ms
    /// - `CHAT_MAX_LEN`: default 500
    /// - `TYPING_TIMEOUT_SECS`: default 5
    /// - `HEARTBEAT_INTERVAL_SECS` / `HEARTBEAT_MAX_MISSED`: default 30s / 2
    /// - `WS_CHANNEL_CAPACITY`: default 256
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            chat: ChatConfig::from_env(),
            heartbeat: HeartbeatConfig::from_env(),
            ws_channel_capacity: env_parse("WS_CHANNEL_CAPACITY", DEFAULT_WS_CHANNEL_CAPACITY).max(1),
        }
    }
}

impl ChatConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            rate_limit: env_parse("CHAT_RATE_LIMIT", DEFAULT_CHAT_RATE_LIMIT),
            rate_window: Duration::from_millis(env_parse("CHAT_RATE_WINDOW_MS", DEFAULT_CHAT_RATE_WINDOW_MS)),
            max_len: env_parse("CHAT_MAX_LEN", DEFAULT_CHAT_MAX_LEN),
            typing_timeout: Duration::from_secs(env_parse("TYPING_TIMEOUT_SECS", DEFAULT_TYPING_TIMEOUT_SECS)),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_CHAT_RATE_LIMIT,
            rate_window: Duration::from_millis(DEFAULT_CHAT_RATE_WINDOW_MS),
            max_len: DEFAULT_CHAT_MAX_LEN,
            typing_timeout: Duration::from_secs(DEFAULT_TYPING_TIMEOUT_SECS),
        }
    }
}

impl HeartbeatConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(env_parse("HEARTBEAT_INTERVAL_SECS", DEFAULT_HEARTBEAT_INTERVAL_SECS).max(1)),
            max_missed: env_parse("HEARTBEAT_MAX_MISSED", DEFAULT_HEARTBEAT_MAX_MISSED),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            max_missed: DEFAULT_HEARTBEAT_MAX_MISSED,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            chat: ChatConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            ws_channel_capacity: DEFAULT_WS_CHANNEL_CAPACITY,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
