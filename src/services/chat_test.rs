use super::*;
use crate::state::test_helpers::{connect_user, drain, test_app_state};

fn chat_to(to: UserId, text: &str) -> Frame {
    Frame::new("chat_message")
        .with_data("to_user_id", to)
        .with_data("message", text)
        .with_data("message_id", "m-1")
}

// =============================================================================
// relay_message
// =============================================================================

#[tokio::test]
async fn message_to_online_friend_is_forwarded_and_confirmed() {
    let (state, store) = test_app_state();
    store.add_user(1, "alice", Some("Al"));
    store.befriend(1, 2);
    let (_c2, mut rx2) = connect_user(&state, 2);

    let confirmation = relay_message(&state, 1, &chat_to(2, "hello")).await.unwrap();
    let confirmation = confirmation.expect("forwarded message is confirmed");
    assert_eq!(confirmation.kind, "message_delivered");
    assert_eq!(confirmation.str_field("message_id"), Some("m-1"));

    let frames = drain(&mut rx2);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, "chat_message");
    assert_eq!(frames[0].i64_field("from_user_id"), Some(1));
    assert_eq!(frames[0].str_field("from_nickname"), Some("Al"));
    assert_eq!(frames[0].str_field("message"), Some("hello"));
}

#[tokio::test]
async fn message_to_offline_friend_has_no_confirmation() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);
    assert_eq!(relay_message(&state, 1, &chat_to(2, "hi")).await.unwrap(), None);
}

#[tokio::test]
async fn message_to_non_friend_is_rejected() {
    let (state, _store) = test_app_state();
    let (_c2, mut rx2) = connect_user(&state, 2);
    let err = relay_message(&state, 1, &chat_to(2, "hi")).await.unwrap_err();
    assert_eq!(err.error_code(), "E_NOT_FRIENDS");
    assert!(drain(&mut rx2).is_empty());
}

#[tokio::test]
async fn message_length_bounds() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);

    let empty = relay_message(&state, 1, &chat_to(2, "  ")).await.unwrap_err();
    assert_eq!(empty.error_code(), "E_EMPTY_MESSAGE");

    let at_limit = "é".repeat(500);
    assert!(relay_message(&state, 1, &chat_to(2, &at_limit)).await.is_ok());

    let over = "a".repeat(501);
    let err = relay_message(&state, 1, &chat_to(2, &over)).await.unwrap_err();
    assert_eq!(err.error_code(), "E_MESSAGE_TOO_LONG");
}

#[tokio::test]
async fn eleventh_message_in_a_second_is_rate_limited() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);
    let (_c2, _rx2) = connect_user(&state, 2);

    for i in 0..10 {
        assert!(relay_message(&state, 1, &chat_to(2, "spam")).await.is_ok(), "message {i}");
    }
    let err = relay_message(&state, 1, &chat_to(2, "spam")).await.unwrap_err();
    assert_eq!(err.error_code(), "E_RATE_LIMITED");
    assert!(err.retryable());
}

#[tokio::test]
async fn missing_recipient_is_rejected() {
    let (state, _store) = test_app_state();
    let err = relay_message(&state, 1, &Frame::new("chat_message").with_data("message", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_MISSING_RECIPIENT");
}

// =============================================================================
// typing and read receipts
// =============================================================================

#[tokio::test]
async fn typing_is_forwarded_and_tracked() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);
    let (_c2, mut rx2) = connect_user(&state, 2);

    relay_typing(&state, 1, &Frame::new("typing_start").with_data("to_user_id", 2), true)
        .await
        .unwrap();
    let frames = drain(&mut rx2);
    assert_eq!(frames[0].kind, "typing_start");
    assert_eq!(frames[0].i64_field("from_user_id"), Some(1));

    relay_typing(&state, 1, &Frame::new("typing_stop").with_data("to_user_id", 2), false)
        .await
        .unwrap();
    assert_eq!(drain(&mut rx2)[0].kind, "typing_stop");
    assert!(!state.typing.stop(1, 2), "stop already cleared the indicator");
}

#[tokio::test]
async fn typing_to_non_friend_is_rejected() {
    let (state, _store) = test_app_state();
    let err = relay_typing(&state, 1, &Frame::new("typing_start").with_data("to_user_id", 2), true)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_NOT_FRIENDS");
}

#[test]
fn read_receipt_goes_back_to_original_sender() {
    let (state, _store) = test_app_state();
    let (_c1, mut rx1) = connect_user(&state, 1);

    let req = Frame::new("read_receipt").with_data("to_user_id", 1).with_data("message_id", "m-9");
    relay_read_receipt(&state, 2, &req).unwrap();

    let frames = drain(&mut rx1);
    assert_eq!(frames[0].kind, "message_read");
    assert_eq!(frames[0].i64_field("from_user_id"), Some(2));
    assert_eq!(frames[0].str_field("message_id"), Some("m-9"));
}

// =============================================================================
// TypingTracker
// =============================================================================

#[test]
fn indicators_expire_after_timeout() {
    let tracker = TypingTracker::new(Duration::from_secs(5));
    let start = Instant::now();
    tracker.start_at(1, 2, start);
    tracker.start_at(3, 4, start + Duration::from_secs(3));

    assert!(tracker.expire_at(start + Duration::from_secs(4)).is_empty());
    assert_eq!(tracker.expire_at(start + Duration::from_secs(5)), vec![(1, 2)]);
    assert_eq!(tracker.expire_at(start + Duration::from_secs(8)), vec![(3, 4)]);
}

#[test]
fn restarting_refreshes_the_indicator() {
    let tracker = TypingTracker::new(Duration::from_secs(5));
    let start = Instant::now();
    tracker.start_at(1, 2, start);
    tracker.start_at(1, 2, start + Duration::from_secs(4));
    assert!(tracker.expire_at(start + Duration::from_secs(6)).is_empty());
}

#[test]
fn clear_user_drops_both_directions() {
    let tracker = TypingTracker::new(Duration::from_secs(5));
    tracker.start(1, 2);
    tracker.start(3, 1);
    assert_eq!(tracker.clear_user(1), vec![(1, 2)]);
    assert!(!tracker.stop(3, 1));
}

#[test]
fn expired_pairs_emit_synthetic_stop() {
    let (state, _store) = test_app_state();
    let (_c2, mut rx2) = connect_user(&state, 2);
    emit_typing_stops(&state, &[(1, 2)]);

    let frames = drain(&mut rx2);
    assert_eq!(frames[0].kind, "typing_stop");
    assert_eq!(frames[0].bool_field("expired"), Some(true));
}
