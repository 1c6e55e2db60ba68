use super::*;

// =============================================================================
// Status enums
// =============================================================================

#[test]
fn session_status_round_trips_through_text() {
    for status in [
        SessionStatus::Waiting,
        SessionStatus::Ready,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
    ] {
        assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(SessionStatus::parse("paused"), None);
}

#[test]
fn only_completed_and_cancelled_are_terminal() {
    assert!(SessionStatus::Completed.is_terminal());
    assert!(SessionStatus::Cancelled.is_terminal());
    assert!(!SessionStatus::InProgress.is_terminal());
    assert!(SessionStatus::Waiting.is_open());
    assert!(SessionStatus::Ready.is_open());
    assert!(!SessionStatus::InProgress.is_open());
}

#[test]
fn session_status_serializes_snake_case() {
    assert_eq!(serde_json::to_value(SessionStatus::InProgress).unwrap(), "in_progress");
}

#[test]
fn accepted_and_ready_participants_count_as_accepted() {
    assert!(ParticipantStatus::Accepted.is_accepted());
    assert!(ParticipantStatus::Ready.is_accepted());
    assert!(!ParticipantStatus::Invited.is_accepted());
    assert!(!ParticipantStatus::Declined.is_accepted());
}

#[test]
fn display_name_prefers_nickname() {
    let mut user = User { id: 1, username: "alice".into(), nickname: None, pin_hash: String::new() };
    assert_eq!(user.display_name(), "alice");
    user.nickname = Some(String::new());
    assert_eq!(user.display_name(), "alice");
    user.nickname = Some("Al".into());
    assert_eq!(user.display_name(), "Al");
}

#[test]
fn user_serialization_hides_pin_hash() {
    let user = User { id: 1, username: "alice".into(), nickname: None, pin_hash: "secret".into() };
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("pin_hash").is_none());
}

// =============================================================================
// MemoryStore: friendship graph
// =============================================================================

#[tokio::test]
async fn friendship_requires_both_edges() {
    let store = MemoryStore::new();
    store.add_user(1, "a", None);
    store.add_user(2, "b", None);
    store.add_user(3, "c", None);
    store.befriend(1, 2);
    store.add_friend_edge(1, 3);

    assert!(store.are_friends(1, 2).await.unwrap());
    assert!(store.are_friends(2, 1).await.unwrap());
    assert!(!store.are_friends(1, 3).await.unwrap());
    assert_eq!(store.friend_ids(1).await.unwrap(), vec![2]);
}

#[tokio::test]
async fn create_user_rejects_duplicate_username() {
    let store = MemoryStore::new();
    store.add_user(5, "alice", None);
    let err = store.create_user("alice", "h").await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateUsername(_)));

    let bob = store.create_user("bob", "h").await.unwrap();
    assert!(bob.id > 5, "generated ids never collide with seeded ones");
}

#[tokio::test]
async fn accepting_a_request_twice_only_succeeds_once() {
    let store = MemoryStore::new();
    let req = store.create_friend_request(1, 2).await.unwrap();
    assert!(store.accept_friend_request(req.id).await.unwrap());
    assert!(!store.accept_friend_request(req.id).await.unwrap());
    assert!(store.are_friends(1, 2).await.unwrap());
}

#[tokio::test]
async fn deleting_pending_request_drops_its_notification() {
    let store = MemoryStore::new();
    let req = store.create_friend_request(1, 2).await.unwrap();
    store
        .upsert_notification(2, NOTIFICATION_FRIEND_REQUEST, "hi", Some(req.id))
        .await
        .unwrap();

    assert_eq!(store.delete_pending_friend_request(1, 2).await.unwrap(), Some(req.id));
    assert!(store.notifications_for(2).await.unwrap().is_empty());
    assert!(store.friend_request(req.id).await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_notification_refreshes_existing_row() {
    let store = MemoryStore::new();
    let first = store.upsert_notification(2, "friend_request", "one", Some(9)).await.unwrap();
    store.mark_notification_read(first.id, 2).await.unwrap();
    let second = store.upsert_notification(2, "friend_request", "two", Some(9)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(!second.read);
    assert_eq!(second.message, "two");
    assert_eq!(store.notifications_for(2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_read_checks_ownership() {
    let store = MemoryStore::new();
    let n = store.upsert_notification(2, "friend_request", "x", None).await.unwrap();
    assert!(!store.mark_notification_read(n.id, 3).await.unwrap());
    assert!(store.mark_notification_read(n.id, 2).await.unwrap());
}

// =============================================================================
// MemoryStore: sessions and moves
// =============================================================================

#[tokio::test]
async fn create_session_seeds_host_and_invitees() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 2, &[3]).await.unwrap();
    assert_eq!(session.status, SessionStatus::Waiting);

    let participants = store.participants(session.id).await.unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0].user_id, 5);
    assert_eq!(participants[0].role, ParticipantRole::Host);
    assert_eq!(participants[0].status, ParticipantStatus::Ready);
    assert!(participants[0].ready);
    assert_eq!(participants[1].status, ParticipantStatus::Invited);
    assert!(!participants[1].ready);
}

#[tokio::test]
async fn transition_is_conditional_on_current_status() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 2, &[3]).await.unwrap();

    assert!(!store
        .transition_session(session.id, &[SessionStatus::Ready], SessionStatus::InProgress)
        .await
        .unwrap());
    assert!(store
        .transition_session(session.id, &SessionStatus::OPEN, SessionStatus::InProgress)
        .await
        .unwrap());

    let session = store.session(session.id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert!(session.started_at.is_some());
}

#[tokio::test]
async fn cancel_session_cancels_every_participant() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 2, &[3]).await.unwrap();
    assert!(store.cancel_session(session.id).await.unwrap());
    assert!(!store.cancel_session(session.id).await.unwrap());

    let participants = store.participants(session.id).await.unwrap();
    assert!(participants.iter().all(|p| p.status == ParticipantStatus::Cancelled && !p.ready));
    assert!(store.active_session_ids(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_invitees_skips_members_and_respects_limit() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 3, &[3]).await.unwrap();
    let added = store.add_invitees(session.id, &[3, 4, 6], 1).await.unwrap();
    assert_eq!(added, vec![4]);
    assert_eq!(store.participants(session.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn insert_move_reports_occupied_cell_and_taken_number() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 2, &[3]).await.unwrap();
    store
        .transition_session(session.id, &SessionStatus::OPEN, SessionStatus::InProgress)
        .await
        .unwrap();

    let first = store.insert_move(session.id, 5, 7, 10, 1, MoveEffect::Continue).await.unwrap();
    assert!(matches!(first, MoveInsert::Inserted(ref m) if m.move_number == 1));
    assert_eq!(
        store.insert_move(session.id, 3, 7, 10, 2, MoveEffect::Continue).await.unwrap(),
        MoveInsert::CellOccupied
    );
    assert_eq!(
        store.insert_move(session.id, 3, 7, 11, 1, MoveEffect::Continue).await.unwrap(),
        MoveInsert::NumberTaken
    );
}

#[tokio::test]
async fn moves_require_in_progress_and_completion_closes_the_session() {
    let store = MemoryStore::new();
    let session = store.create_session(5, "caro", 2, &[3]).await.unwrap();
    assert_eq!(
        store.insert_move(session.id, 5, 7, 10, 1, MoveEffect::Continue).await.unwrap(),
        MoveInsert::NotInProgress
    );

    store
        .transition_session(session.id, &SessionStatus::OPEN, SessionStatus::InProgress)
        .await
        .unwrap();
    let winning = store
        .insert_move(session.id, 5, 7, 10, 1, MoveEffect::Complete { winner: Some(5) })
        .await
        .unwrap();
    assert!(matches!(winning, MoveInsert::Inserted(_)));

    let done = store.session(session.id).await.unwrap().unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.winner_user_id, Some(5));
    assert!(done.completed_at.is_some());

    // Nothing lands after completion, not even on a free cell.
    assert_eq!(
        store.insert_move(session.id, 3, 8, 10, 2, MoveEffect::Continue).await.unwrap(),
        MoveInsert::NotInProgress
    );
    assert_eq!(store.moves(session.id).await.unwrap().len(), 1);
}
