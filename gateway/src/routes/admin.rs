//! Administrative API key routes.
//!
//! Both operations require a caller holding the `admin` permission
//! and go through the same authentication + quota path as predict
//! requests.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bst_common::Permission;
use serde::{Deserialize, Serialize};

use crate::auth::{authorize, CreatedKey, NewKeySpec, RedactedKey};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CreateKeyRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rate_limit: Option<u32>,
    #[serde(default)]
    permissions: Option<Vec<Permission>>,
}

#[derive(Serialize)]
struct ListKeysResponse {
    api_keys: Vec<RedactedKey>,
}

/// POST /admin/api-keys - mint a key. The secret is returned here and
/// never again.
async fn create_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateKeyRequest>,
) -> Result<Json<CreatedKey>> {
    let auth = authorize(
        &headers,
        &state.config.security,
        state.keys.as_ref(),
        state.limiter.as_ref(),
    )?;
    auth.require(Permission::Admin)?;

    let created = state.keys.create(NewKeySpec {
        display_name: request.name,
        quota_per_window: request.rate_limit,
        permissions: request
            .permissions
            .map(|perms| perms.into_iter().collect::<HashSet<_>>()),
    });

    tracing::info!(name = %created.name, "created API key");
    Ok(Json(created))
}

/// GET /admin/api-keys - redacted listing, prefixes only.
async fn list_keys(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ListKeysResponse>> {
    let auth = authorize(
        &headers,
        &state.config.security,
        state.keys.as_ref(),
        state.limiter.as_ref(),
    )?;
    auth.require(Permission::Admin)?;

    Ok(Json(ListKeysResponse {
        api_keys: state.keys.list(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api-keys", post(create_key).get(list_keys))
        .with_state(state)
}
