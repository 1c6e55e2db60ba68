use super::*;

const LIMIT: usize = 10;
const WINDOW: Duration = Duration::from_secs(1);

fn limiter() -> RateLimiter {
    RateLimiter::new(LIMIT, WINDOW)
}

#[test]
fn allows_up_to_limit_then_rejects() {
    let rl = limiter();
    let now = Instant::now();

    for i in 0..LIMIT {
        assert!(rl.check_and_record_at(7, now).is_ok(), "message {i} should pass");
    }
    assert_eq!(
        rl.check_and_record_at(7, now),
        Err(RateLimitError::Exceeded { limit: LIMIT, window_ms: 1000 })
    );
}

#[test]
fn window_expiry_allows_new_messages() {
    let rl = limiter();
    let start = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(7, start).unwrap();
    }
    assert!(rl.check_and_record_at(7, start).is_err());

    let after_window = start + WINDOW;
    assert!(rl.check_and_record_at(7, after_window).is_ok());
}

#[test]
fn window_slides_rather_than_resetting() {
    let rl = limiter();
    let start = Instant::now();

    // Half the budget at t=0, the other half at t=600ms.
    for _ in 0..LIMIT / 2 {
        rl.check_and_record_at(7, start).unwrap();
    }
    let mid = start + Duration::from_millis(600);
    for _ in 0..LIMIT / 2 {
        rl.check_and_record_at(7, mid).unwrap();
    }
    assert!(rl.check_and_record_at(7, mid).is_err());

    // At t=1000ms the first half has left the window, the second has not.
    let later = start + WINDOW;
    for _ in 0..LIMIT / 2 {
        rl.check_and_record_at(7, later).unwrap();
    }
    assert!(rl.check_and_record_at(7, later).is_err());
}

#[test]
fn rejected_messages_are_not_recorded() {
    let rl = limiter();
    let start = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(7, start).unwrap();
    }
    for _ in 0..5 {
        assert!(rl.check_and_record_at(7, start + Duration::from_millis(500)).is_err());
    }
    assert!(rl.check_and_record_at(7, start + WINDOW).is_ok());
}

#[test]
fn distinct_senders_do_not_interfere() {
    let rl = limiter();
    let now = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(1, now).unwrap();
    }
    assert!(rl.check_and_record_at(1, now).is_err());
    assert!(rl.check_and_record_at(2, now).is_ok());
}

#[test]
fn sweep_drops_drained_senders() {
    let rl = limiter();
    let start = Instant::now();
    rl.check_and_record_at(1, start).unwrap();
    rl.check_and_record_at(2, start + Duration::from_millis(900)).unwrap();

    rl.sweep_at(start + WINDOW);
    assert_eq!(rl.tracked_senders(), 1);

    rl.sweep_at(start + WINDOW * 2);
    assert_eq!(rl.tracked_senders(), 0);
}
