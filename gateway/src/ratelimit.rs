//! Per-key sliding-window rate limiting.
//!
//! The window is an exact trailing window, not bucketed: every check
//! looks back `window` from the supplied instant. Purge cost is
//! O(window size) per call, which is bounded by the key's quota.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Result of one admission check.
#[derive(Debug, Clone, Copy)]
pub struct AdmitDecision {
    pub allowed: bool,
    /// Requests counted against the window, including this one when
    /// admitted.
    pub used: u32,
    pub quota: u32,
    /// Instant the oldest in-window request expires and a slot frees.
    pub reset_at: DateTime<Utc>,
}

/// Admission control keyed by an opaque key hash.
///
/// Implementations never fail: absence of prior state is zero usage.
/// The trait seam exists so a shared external store can replace the
/// in-process window without touching the orchestrator.
pub trait RateLimiter: Send + Sync {
    fn admit(&self, key_hash: &str, quota: u32, now: DateTime<Utc>) -> AdmitDecision;
}

/// In-process sliding window over per-key timestamp lists.
pub struct SlidingWindowLimiter {
    window: Duration,
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn admit(&self, key_hash: &str, quota: u32, now: DateTime<Utc>) -> AdmitDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entries = windows.entry(key_hash.to_string()).or_default();

        let cutoff = now - self.window;
        entries.retain(|stamp| *stamp > cutoff);

        let used = entries.len() as u32;
        let allowed = used < quota;
        if allowed {
            entries.push(now);
        }

        let reset_at = entries
            .first()
            .map(|oldest| *oldest + self.window)
            .unwrap_or(now + self.window);

        AdmitDecision {
            allowed,
            used: if allowed { used + 1 } else { used },
            quota,
            reset_at,
        }
    }
}
