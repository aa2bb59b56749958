//! Service banner and health endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::engine::BackendAvailability;
use crate::AppState;

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
    authentication_required: bool,
    available_endpoints: [&'static str; 3],
    documentation: &'static str,
}

async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "BST Inference Gateway",
        status: "ready",
        version: env!("CARGO_PKG_VERSION"),
        authentication_required: state.config.security.require_auth,
        available_endpoints: ["/predict", "/predict/torchscript", "/predict/onnx"],
        documentation: if state.config.api.enable_docs {
            "/docs"
        } else {
            "disabled"
        },
    })
}

#[derive(Serialize)]
struct RateLimitSummary {
    enabled: bool,
    requests_per_window: u32,
    window_seconds: u64,
}

#[derive(Serialize)]
struct SecuritySummary {
    authentication_required: bool,
    rate_limiting: RateLimitSummary,
    active_api_keys: usize,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backends: BTreeMap<&'static str, BackendAvailability>,
    model: crate::config::ModelConfig,
    security: SecuritySummary,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut backends = BTreeMap::new();
    for engine in state.backends.all() {
        backends.insert(engine.engine_type(), engine.availability().await);
    }

    let security = &state.config.security;
    Json(HealthResponse {
        status: "healthy",
        backends,
        model: state.config.model.clone(),
        security: SecuritySummary {
            authentication_required: security.require_auth,
            rate_limiting: RateLimitSummary {
                enabled: security.rate_limit_enabled,
                requests_per_window: security.rate_limit_requests,
                window_seconds: security.rate_limit_window_secs,
            },
            active_api_keys: state.keys.enabled_count(),
        },
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
}
