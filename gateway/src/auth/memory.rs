//! In-memory key store.
//!
//! Single-process stand-in for a real key datastore; records live for
//! the process lifetime.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use bst_common::Permission;
use chrono::Utc;

use crate::error::{Error, Result};

use super::{
    generate_api_key, limiter_key_hash, ApiKeyRecord, CreatedKey, KeyIdentity, KeyStore,
    NewKeySpec, RedactedKey, ADMIN_QUOTA,
};

pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
    default_quota: u32,
}

impl InMemoryKeyStore {
    pub fn new(default_quota: u32) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            default_quota,
        }
    }

    /// Insert a record with a known secret (bootstrap and tests).
    pub fn insert(&self, record: ApiKeyRecord) {
        let mut keys = self
            .keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.insert(record.key.clone(), record);
    }

    /// Register the configured admin key with predict + admin
    /// permissions and the elevated admin quota.
    pub fn bootstrap_admin(&self, secret: &str) {
        self.insert(ApiKeyRecord {
            key: secret.to_string(),
            display_name: "Admin Key".to_string(),
            created_at: Utc::now(),
            quota_per_window: ADMIN_QUOTA,
            enabled: true,
            permissions: HashSet::from([Permission::Predict, Permission::Admin]),
        });
    }
}

impl KeyStore for InMemoryKeyStore {
    fn authenticate(&self, key: &str) -> Result<KeyIdentity> {
        let keys = self
            .keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let record = keys.get(key).filter(|r| r.enabled).ok_or(Error::InvalidApiKey)?;

        Ok(KeyIdentity {
            display_name: record.display_name.clone(),
            quota_per_window: record.quota_per_window,
            permissions: record.permissions.clone(),
            key_hash: limiter_key_hash(key),
        })
    }

    fn create(&self, spec: NewKeySpec) -> CreatedKey {
        let record = ApiKeyRecord {
            key: generate_api_key(),
            display_name: spec
                .display_name
                .unwrap_or_else(|| "Generated Key".to_string()),
            created_at: Utc::now(),
            quota_per_window: spec.quota_per_window.unwrap_or(self.default_quota),
            enabled: true,
            permissions: spec
                .permissions
                .unwrap_or_else(|| HashSet::from([Permission::Predict])),
        };

        let created = CreatedKey {
            api_key: record.key.clone(),
            name: record.display_name.clone(),
            created_at: record.created_at,
        };
        self.insert(record);
        created
    }

    fn list(&self) -> Vec<RedactedKey> {
        let keys = self
            .keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut listing: Vec<RedactedKey> = keys
            .values()
            .map(|record| {
                let prefix: String = record.key.chars().take(8).collect();
                let mut permissions: Vec<Permission> =
                    record.permissions.iter().copied().collect();
                permissions.sort();
                RedactedKey {
                    key_prefix: format!("{prefix}..."),
                    name: record.display_name.clone(),
                    created_at: record.created_at,
                    enabled: record.enabled,
                    rate_limit: record.quota_per_window,
                    permissions,
                }
            })
            .collect();
        listing.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        listing
    }

    fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        let mut keys = self
            .keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match keys.get_mut(key) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn enabled_count(&self) -> usize {
        let keys = self
            .keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.values().filter(|record| record.enabled).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_applies_defaults() {
        let store = InMemoryKeyStore::new(100);
        let created = store.create(NewKeySpec::default());

        assert!(created.api_key.starts_with("bst_"));
        assert_eq!(created.name, "Generated Key");

        let identity = store.authenticate(&created.api_key).unwrap();
        assert_eq!(identity.quota_per_window, 100);
        assert!(identity.permissions.contains(&Permission::Predict));
        assert!(!identity.permissions.contains(&Permission::Admin));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let store = InMemoryKeyStore::new(100);
        assert!(matches!(
            store.authenticate("nope").unwrap_err(),
            Error::InvalidApiKey
        ));
    }

    #[test]
    fn test_disabled_key_rejected_but_retained() {
        let store = InMemoryKeyStore::new(100);
        let created = store.create(NewKeySpec {
            display_name: Some("Revoked".to_string()),
            ..NewKeySpec::default()
        });

        assert!(store.authenticate(&created.api_key).is_ok());
        assert!(store.set_enabled(&created.api_key, false));
        assert!(matches!(
            store.authenticate(&created.api_key).unwrap_err(),
            Error::InvalidApiKey
        ));

        // Record survives soft-disable.
        let listing = store.list();
        assert_eq!(listing.len(), 1);
        assert!(!listing[0].enabled);
        assert_eq!(store.enabled_count(), 0);
    }

    #[test]
    fn test_listing_is_redacted() {
        let store = InMemoryKeyStore::new(100);
        let created = store.create(NewKeySpec::default());

        let listing = store.list();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].key_prefix.ends_with("..."));
        assert_eq!(listing[0].key_prefix.len(), 8 + 3);
        assert!(!listing[0].key_prefix.contains(&created.api_key));
    }

    #[test]
    fn test_bootstrap_admin_permissions() {
        let store = InMemoryKeyStore::new(100);
        store.bootstrap_admin("admin-secret");

        let identity = store.authenticate("admin-secret").unwrap();
        assert!(identity.permissions.contains(&Permission::Admin));
        assert!(identity.permissions.contains(&Permission::Predict));
        assert_eq!(identity.quota_per_window, ADMIN_QUOTA);
    }
}
