//! HTTP routing. Handlers translate orchestration outcomes into
//! status codes; no business logic lives here beyond dispatch.

pub mod admin;
pub mod health;
pub mod predict;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Assemble the full application router. Middleware layers (CORS,
/// tracing, request logging) are applied by the caller.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(predict::router(state.clone()))
        .nest("/admin", admin::router(state))
}
