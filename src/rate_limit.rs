//! In-memory rate limiting for chat messages.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<UserId, VecDeque<Instant>>`.
//! One limit is enforced per sender: `limit` messages per `window`
//! (10 per second by default). Rejected messages are not recorded, so a
//! sender hammering the limit does not extend its own penalty.
//!
//! Idle senders are pruned lazily on their next message; `sweep` drops
//! empty queues so the map does not grow with every user ever seen.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::store::UserId;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} messages per {window_ms}ms)")]
    Exceeded { limit: usize, window_ms: u128 },
}

impl crate::frame::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<UserId, VecDeque<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), limit, window }
    }

    /// Check the sender's window, then record the message.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` when the sender already sent `limit` messages
    /// inside the current window.
    pub fn check_and_record(&self, user_id: UserId) -> Result<(), RateLimitError> {
        self.check_and_record_at(user_id, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, user_id: UserId, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let deque = inner.entry(user_id).or_default();
        prune_window(deque, now, self.window);
        if deque.len() >= self.limit {
            return Err(RateLimitError::Exceeded { limit: self.limit, window_ms: self.window.as_millis() });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Drop senders whose window has fully drained.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.retain(|_, deque| {
            prune_window(deque, now, self.window);
            !deque.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_senders(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
