use super::*;
use serde_json::json;

#[test]
fn new_frame_has_type_and_no_data() {
    let frame = Frame::new(TYPE_PING);
    assert_eq!(frame.kind, "ping");
    assert!(frame.data.is_empty());
}

#[test]
fn serializes_flat_with_type_key() {
    let frame = Frame::new(TYPE_USER_STATUS_UPDATE)
        .with_data("user_id", 3)
        .with_data("status", "online");
    let value: serde_json::Value = serde_json::from_str(&frame.to_text().expect("serialize")).expect("json");

    assert_eq!(value["type"], "user_status_update");
    assert_eq!(value["user_id"], 3);
    assert_eq!(value["status"], "online");
    assert!(value.get("data").is_none(), "payload must be flat");
}

#[test]
fn parse_json_collects_remaining_keys() {
    let frame = Frame::parse(r#"{"type":"init","user_id":5,"device":"ESP32"}"#).expect("parse");
    assert_eq!(frame.kind, "init");
    assert_eq!(frame.i64_field("user_id"), Some(5));
    assert_eq!(frame.str_field("device"), Some("ESP32"));
    assert!(!frame.data.contains_key("type"));
}

#[test]
fn parse_json_without_type_is_an_error() {
    let err = Frame::parse(r#"{"user_id":5}"#).expect_err("type is required");
    assert_eq!(err.error_code(), "E_INVALID_JSON");
}

#[test]
fn parse_legacy_pattern() {
    let frame = Frame::parse("type:login-*-username:player1-*-pin:4321").expect("parse");
    assert_eq!(frame.kind, "login");
    assert_eq!(frame.str_field("username"), Some("player1"));
    assert_eq!(frame.str_field("pin"), Some("4321"));
}

#[test]
fn parse_legacy_splits_on_first_colon_only() {
    let frame = Frame::parse("type:chat_message-*-message:time is 10:30").expect("parse");
    assert_eq!(frame.str_field("message"), Some("time is 10:30"));
}

#[test]
fn parse_legacy_without_type_is_an_error() {
    let err = Frame::parse("username:player1").expect_err("missing type");
    assert!(matches!(err, FrameError::MissingType));
}

#[test]
fn numeric_accessors_accept_strings() {
    let frame = Frame::parse("type:init-*-user_id:12").expect("parse");
    assert_eq!(frame.i64_field("user_id"), Some(12));
}

#[test]
fn bool_accessor_variants() {
    let frame = Frame::new("x")
        .with_data("a", true)
        .with_data("b", "false")
        .with_data("c", "1")
        .with_data("d", "maybe");
    assert_eq!(frame.bool_field("a"), Some(true));
    assert_eq!(frame.bool_field("b"), Some(false));
    assert_eq!(frame.bool_field("c"), Some(true));
    assert_eq!(frame.bool_field("d"), None);
    assert_eq!(frame.bool_field("missing"), None);
}

#[test]
fn i64_list_from_array_and_csv() {
    let frame = Frame::new("x")
        .with_data("ids", json!([1, "2", "x", 3]))
        .with_data("csv", "4, 5,six,6");
    assert_eq!(frame.i64_list("ids"), vec![1, 2, 3]);
    assert_eq!(frame.i64_list("csv"), vec![4, 5, 6]);
    assert!(frame.i64_list("missing").is_empty());
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("state changed")]
    struct Changed;

    impl ErrorCode for Changed {
        fn error_code(&self) -> &'static str {
            "E_CONFLICT"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let err = Frame::error_from(&Changed);
    assert_eq!(err.kind, "error");
    assert_eq!(err.str_field("code"), Some("E_CONFLICT"));
    assert_eq!(err.str_field("message"), Some("state changed"));
    assert_eq!(err.bool_field("retryable"), Some(true));

    let chat = Frame::error_as(TYPE_CHAT_ERROR, &Changed);
    assert_eq!(chat.kind, "chat_error");
}

