use super::*;
use crate::state::test_helpers::{connect_user, drain, test_app_state};

#[test]
fn deliver_dedupes_and_reports_offline_targets() {
    let (state, _store) = test_app_state();
    let (_c1, mut rx1) = connect_user(&state, 1);

    let report = deliver(&state.registry, [1, 1, 2], &Frame::new("ping"));

    assert_eq!(report.delivered, vec![1]);
    assert_eq!(report.offline, vec![2]);
    assert_eq!(drain(&mut rx1).len(), 1, "duplicate targets receive one copy");
}

#[test]
fn one_closed_target_does_not_block_others() {
    let (state, _store) = test_app_state();
    let (_c1, rx1) = connect_user(&state, 1);
    let (_c2, mut rx2) = connect_user(&state, 2);
    drop(rx1);

    let report = deliver(&state.registry, [1, 2], &Frame::new("x"));
    assert!(!report.delivered.contains(&1));
    assert!(report.delivered.contains(&2));
    assert_eq!(drain(&mut rx2).len(), 1);
}

#[test]
fn status_update_shape() {
    let frame = status_update(4, false);
    assert_eq!(frame.kind, "user_status_update");
    assert_eq!(frame.i64_field("user_id"), Some(4));
    assert_eq!(frame.str_field("status"), Some("offline"));
}

#[test]
fn notification_event_carries_row_fields() {
    let n = Notification {
        id: 11,
        user_id: 2,
        kind: "friend_request".into(),
        message: "alice sent you a friend request".into(),
        related_id: Some(5),
        read: false,
        created_at: 1_700_000_000_000,
    };
    let frame = notification_event(&n);
    assert_eq!(frame.kind, "notification");
    assert_eq!(frame.i64_field("notification_id"), Some(11));
    assert_eq!(frame.str_field("notification_type"), Some("friend_request"));
    assert_eq!(frame.i64_field("related_id"), Some(5));
    assert_eq!(frame.bool_field("read"), Some(false));
}

#[test]
fn game_event_shape() {
    let frame = game_event("move", 9).with_data("current_turn", 3);
    assert_eq!(frame.kind, "game_event");
    assert_eq!(frame.str_field("event_type"), Some("move"));
    assert_eq!(frame.i64_field("session_id"), Some(9));
    assert_eq!(frame.i64_field("current_turn"), Some(3));
}
