//! Capability permissions attached to API keys.

use serde::{Deserialize, Serialize};

/// Operations an API key may be authorized for.
///
/// Checked by explicit set membership on the authenticated identity,
/// never by string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// May call the prediction endpoints.
    Predict,
    /// May manage API keys.
    Admin,
}

impl Permission {
    /// All permission variants for iteration.
    pub const ALL: [Permission; 2] = [Permission::Predict, Permission::Admin];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Predict => write!(f, "predict"),
            Permission::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_serialization() {
        let json = serde_json::to_string(&Permission::Predict).unwrap();
        assert_eq!(json, r#""predict""#);

        let parsed: Permission = serde_json::from_str(r#""admin""#).unwrap();
        assert_eq!(parsed, Permission::Admin);
    }

    #[test]
    fn test_permission_roundtrip_all() {
        for perm in Permission::ALL {
            let json = serde_json::to_string(&perm).unwrap();
            let parsed: Permission = serde_json::from_str(&json).unwrap();
            assert_eq!(perm, parsed);
        }
    }
}
