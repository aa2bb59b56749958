//! Test helpers shared by unit and integration tests.

mod mock_engine;

pub use mock_engine::MockEngine;

use std::sync::Arc;

use crate::auth::InMemoryKeyStore;
use crate::config::Config;
use crate::engine::{BackendSet, InferenceEngine};
use crate::ratelimit::SlidingWindowLimiter;
use crate::AppState;

/// Build an `AppState` around the given backends, sharing the key
/// store so tests can seed and mutate keys directly.
pub fn build_state(
    config: Config,
    keys: Arc<InMemoryKeyStore>,
    primary: Arc<dyn InferenceEngine>,
    secondary: Arc<dyn InferenceEngine>,
) -> Arc<AppState> {
    let limiter = Arc::new(SlidingWindowLimiter::new(
        config.security.rate_limit_window_secs,
    ));
    Arc::new(AppState::new(
        config,
        keys,
        limiter,
        BackendSet::new(primary, secondary),
    ))
}
