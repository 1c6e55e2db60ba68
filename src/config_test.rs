use super::*;

// =============================================================================
// env_parse — unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__TEST_LOBBY_NONEXISTENT_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEST_LOBBY_EP_VALID__", " 99 ") };
    let val: u64 = env_parse("__TEST_LOBBY_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEST_LOBBY_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEST_LOBBY_EP_INVALID__", "notanumber") };
    let val: u32 = env_parse("__TEST_LOBBY_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEST_LOBBY_EP_INVALID__") };
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn chat_defaults_match_protocol_limits() {
    let chat = ChatConfig::default();
    assert_eq!(chat.rate_limit, 10);
    assert_eq!(chat.rate_window, Duration::from_secs(1));
    assert_eq!(chat.max_len, 500);
    assert_eq!(chat.typing_timeout, Duration::from_secs(5));
}

#[test]
fn server_default_uses_memory_store() {
    let config = ServerConfig::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.database_url.is_none());
    assert_eq!(config.heartbeat.max_missed, DEFAULT_HEARTBEAT_MAX_MISSED);
}
