//! API key authentication and caller authorization.
//!
//! The key authority confirms identity and quota; permission checks
//! happen afterwards, against the capability set on the identity.

mod memory;

pub use memory::InMemoryKeyStore;

use std::collections::HashSet;

use axum::http::HeaderMap;
use bst_common::Permission;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::SecurityConfig;
use crate::error::{Error, Result};
use crate::ratelimit::{AdmitDecision, RateLimiter};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Quota assigned to the bootstrapped admin key.
pub const ADMIN_QUOTA: u32 = 1000;

/// One stored API key. Never deleted; disabling is the only
/// revocation mechanism.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub quota_per_window: u32,
    pub enabled: bool,
    pub permissions: HashSet<Permission>,
}

/// Resolved identity of an authenticated caller.
#[derive(Debug, Clone)]
pub struct KeyIdentity {
    pub display_name: String,
    pub quota_per_window: u32,
    pub permissions: HashSet<Permission>,
    /// Hash used to key the rate limiter, never the raw secret.
    pub key_hash: String,
}

/// Parameters for creating a key. Unset fields fall back to store
/// defaults (predict-only, global quota).
#[derive(Debug, Clone, Default)]
pub struct NewKeySpec {
    pub display_name: Option<String>,
    pub quota_per_window: Option<u32>,
    pub permissions: Option<HashSet<Permission>>,
}

/// A freshly created key. The only place the secret is ever returned.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedKey {
    pub api_key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a key: prefix only, no secret.
#[derive(Debug, Clone, Serialize)]
pub struct RedactedKey {
    pub key_prefix: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub enabled: bool,
    pub rate_limit: u32,
    pub permissions: Vec<Permission>,
}

/// Key authority operations.
///
/// The trait seam lets a persistent store replace the in-memory map
/// without changing the orchestrator.
pub trait KeyStore: Send + Sync {
    /// Resolve a secret to an identity. Fails with `InvalidApiKey`
    /// for unknown or disabled keys.
    fn authenticate(&self, key: &str) -> Result<KeyIdentity>;

    /// Mint a new key. Caller must already hold admin permission.
    fn create(&self, spec: NewKeySpec) -> CreatedKey;

    fn list(&self) -> Vec<RedactedKey>;

    /// Soft-disable or re-enable a key. Returns false if the key does
    /// not exist.
    fn set_enabled(&self, key: &str, enabled: bool) -> bool;

    fn enabled_count(&self) -> usize;
}

/// Hash a secret for rate-limit bookkeeping.
pub fn limiter_key_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Generate a new opaque secret.
pub fn generate_api_key() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(43)
        .map(char::from)
        .collect();
    format!("bst_{suffix}")
}

/// Outcome of the authentication + rate-admission step.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub key_name: String,
    pub permissions: HashSet<Permission>,
    /// Present when quota accounting ran for this request.
    pub rate: Option<AdmitDecision>,
}

impl AuthContext {
    fn anonymous() -> Self {
        Self {
            key_name: "anonymous".to_string(),
            permissions: HashSet::from([Permission::Predict]),
            rate: None,
        }
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.permissions.contains(&permission) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(permission))
        }
    }

    pub fn rate_limit_remaining(&self) -> Option<u32> {
        self.rate
            .map(|decision| decision.quota.saturating_sub(decision.used))
    }
}

/// Authenticate the caller and consume a quota slot.
///
/// Order is fixed: identity first, then rate admission with the
/// record's own quota. A limiter rejection is `QuotaExceeded`, not an
/// authentication failure, and an unrecognized key never consumes
/// quota. With auth disabled the caller is anonymous and no quota is
/// tracked.
pub fn authorize(
    headers: &HeaderMap,
    security: &SecurityConfig,
    keys: &dyn KeyStore,
    limiter: &dyn RateLimiter,
) -> Result<AuthContext> {
    if !security.require_auth {
        return Ok(AuthContext::anonymous());
    }

    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingApiKey)?;

    let identity = keys.authenticate(key)?;

    let rate = if security.rate_limit_enabled {
        let decision = limiter.admit(&identity.key_hash, identity.quota_per_window, Utc::now());
        if !decision.allowed {
            return Err(Error::QuotaExceeded {
                used: decision.used,
                quota: decision.quota,
                reset_at: decision.reset_at,
            });
        }
        Some(decision)
    } else {
        None
    };

    Ok(AuthContext {
        key_name: identity.display_name,
        permissions: identity.permissions,
        rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::SlidingWindowLimiter;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key.parse().unwrap());
        headers
    }

    fn store_with_key(key: &str) -> InMemoryKeyStore {
        let store = InMemoryKeyStore::new(100);
        store.insert(ApiKeyRecord {
            key: key.to_string(),
            display_name: "Test Key".to_string(),
            created_at: Utc::now(),
            quota_per_window: 2,
            enabled: true,
            permissions: HashSet::from([Permission::Predict]),
        });
        store
    }

    #[test]
    fn test_limiter_key_hash_is_stable_prefix() {
        let hash = limiter_key_hash("demo-api-key-12345");
        assert_eq!(hash.len(), 16);
        assert_eq!(hash, limiter_key_hash("demo-api-key-12345"));
        assert_ne!(hash, limiter_key_hash("other-key"));
    }

    #[test]
    fn test_generated_keys_are_prefixed_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert!(a.starts_with("bst_"));
        assert_eq!(a.len(), 4 + 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorize_missing_key() {
        let store = store_with_key("secret");
        let limiter = SlidingWindowLimiter::new(60);
        let error = authorize(
            &HeaderMap::new(),
            &SecurityConfig::default(),
            &store,
            &limiter,
        )
        .unwrap_err();
        assert!(matches!(error, Error::MissingApiKey));
    }

    #[test]
    fn test_authorize_quota_consumed_per_call() {
        let store = store_with_key("secret");
        let limiter = SlidingWindowLimiter::new(60);
        let security = SecurityConfig::default();
        let headers = headers_with_key("secret");

        for _ in 0..2 {
            let context = authorize(&headers, &security, &store, &limiter).unwrap();
            assert!(context.rate.is_some());
        }
        let error = authorize(&headers, &security, &store, &limiter).unwrap_err();
        assert!(matches!(error, Error::QuotaExceeded { quota: 2, .. }));
    }

    #[test]
    fn test_authorize_anonymous_when_auth_disabled() {
        let store = store_with_key("secret");
        let limiter = SlidingWindowLimiter::new(60);
        let security = SecurityConfig {
            require_auth: false,
            ..SecurityConfig::default()
        };

        let context = authorize(&HeaderMap::new(), &security, &store, &limiter).unwrap();
        assert_eq!(context.key_name, "anonymous");
        assert!(context.rate.is_none());
        assert!(context.require(Permission::Predict).is_ok());
        assert!(context.require(Permission::Admin).is_err());
    }

    #[test]
    fn test_rate_limit_disabled_skips_quota() {
        let store = store_with_key("secret");
        let limiter = SlidingWindowLimiter::new(60);
        let security = SecurityConfig {
            rate_limit_enabled: false,
            ..SecurityConfig::default()
        };
        let headers = headers_with_key("secret");

        // Quota is 2; without accounting every call passes.
        for _ in 0..5 {
            let context = authorize(&headers, &security, &store, &limiter).unwrap();
            assert!(context.rate.is_none());
        }
    }
}
