use super::*;
use crate::state::test_helpers::{connect_user, drain, test_app_state};

#[tokio::test]
async fn bind_notifies_online_friends_and_reports_them_back() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);
    store.befriend(1, 3);

    let (_c2, mut rx2) = connect_user(&state, 2);
    let (_c1, mut rx1) = connect_user(&state, 1);

    let online = on_bind(&state, 1).await.unwrap();
    assert_eq!(online, vec![2]);

    let to_friend = drain(&mut rx2);
    assert_eq!(to_friend.len(), 1);
    assert_eq!(to_friend[0].i64_field("user_id"), Some(1));
    assert_eq!(to_friend[0].str_field("status"), Some("online"));

    let to_self = drain(&mut rx1);
    assert_eq!(to_self.len(), 1);
    assert_eq!(to_self[0].i64_field("user_id"), Some(2));
    assert_eq!(to_self[0].str_field("status"), Some("online"));
}

#[tokio::test]
async fn one_sided_edge_gets_no_presence() {
    let (state, store) = test_app_state();
    store.add_friend_edge(1, 2);
    let (_c2, mut rx2) = connect_user(&state, 2);
    let (_c1, _rx1) = connect_user(&state, 1);

    assert!(on_bind(&state, 1).await.unwrap().is_empty());
    assert!(drain(&mut rx2).is_empty());
}

#[tokio::test]
async fn unbind_notifies_only_online_friends() {
    let (state, store) = test_app_state();
    store.befriend(1, 2);
    store.befriend(1, 3);
    store.befriend(4, 5);
    let (_c2, mut rx2) = connect_user(&state, 2);
    let (_c4, mut rx4) = connect_user(&state, 4);

    on_unbind(&state, 1).await;

    let frames = drain(&mut rx2);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].str_field("status"), Some("offline"));
    assert!(drain(&mut rx4).is_empty(), "non-friends hear nothing");
}
