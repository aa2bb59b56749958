//! Shared application state.
//!
//! Constructed once at startup and passed by handle to all request
//! handlers; there is no module-level mutable state.

use std::sync::Arc;

use crate::auth::KeyStore;
use crate::config::Config;
use crate::engine::BackendSet;
use crate::ratelimit::RateLimiter;

pub struct AppState {
    pub config: Config,
    pub keys: Arc<dyn KeyStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub backends: BackendSet,
}

impl AppState {
    pub fn new(
        config: Config,
        keys: Arc<dyn KeyStore>,
        limiter: Arc<dyn RateLimiter>,
        backends: BackendSet,
    ) -> Self {
        Self {
            config,
            keys,
            limiter,
            backends,
        }
    }
}
