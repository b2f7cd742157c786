//! Shared application state handed to every HTTP and WebSocket handler.

use std::sync::Arc;

use crate::config::Config;
use crate::ratelimit::RateLimiter;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(config.max_sessions)),
            rate_limiter: Arc::new(RateLimiter::for_session_creation()),
            config: Arc::new(config),
        }
    }
}
