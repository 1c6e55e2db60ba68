use super::*;
use crate::state::test_helpers::test_app_state;
use crate::store::{Store, NOTIFICATION_FRIEND_REQUEST};

#[tokio::test]
async fn list_counts_unread_and_mark_read_clears() {
    let (state, store) = test_app_state();
    let first = store
        .upsert_notification(1, NOTIFICATION_FRIEND_REQUEST, "a", Some(10))
        .await
        .unwrap();
    store
        .upsert_notification(1, NOTIFICATION_FRIEND_REQUEST, "b", Some(11))
        .await
        .unwrap();

    let (items, unread) = list(&state, 1).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(unread, 2);

    mark_read(&state, first.id, 1).await.unwrap();
    let (_, unread) = list(&state, 1).await.unwrap();
    assert_eq!(unread, 1);
}

#[tokio::test]
async fn marking_someone_elses_notification_fails() {
    let (state, store) = test_app_state();
    let n = store
        .upsert_notification(1, NOTIFICATION_FRIEND_REQUEST, "a", None)
        .await
        .unwrap();
    let err = mark_read(&state, n.id, 2).await.unwrap_err();
    assert_eq!(err.error_code(), "E_NOTIFICATION_NOT_FOUND");
    assert!(matches!(mark_read(&state, 999, 1).await, Err(NotificationError::NotFound(999))));
}
