//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the collaborator handles (durable store and user directory),
//! the live connection registry, the chat rate limiter, the typing tracker
//! and the parsed configuration. Presence is never persisted; it is
//! derived from the registry.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::services::chat::TypingTracker;
use crate::services::registry::ConnectionRegistry;
use crate::store::{Store, UserDirectory};

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub directory: Arc<dyn UserDirectory>,
    pub registry: ConnectionRegistry,
    /// Sliding-window limiter for chat messages.
    pub rate_limiter: RateLimiter,
    pub typing: TypingTracker,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, directory: Arc<dyn UserDirectory>, config: ServerConfig) -> Self {
        Self {
            store,
            directory,
            registry: ConnectionRegistry::new(),
            rate_limiter: RateLimiter::new(config.chat.rate_limit, config.chat.rate_window),
            typing: TypingTracker::new(config.chat.typing_timeout),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
