use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bst_gateway::auth::InMemoryKeyStore;
use bst_gateway::engine::{BackendSet, OnnxEngine, TorchServingEngine};
use bst_gateway::ratelimit::SlidingWindowLimiter;
use bst_gateway::{logging, routes, AppState, Config};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BST Inference Gateway");

    // Key authority with optional bootstrap admin key
    let keys = Arc::new(InMemoryKeyStore::new(config.security.rate_limit_requests));
    if let Some(admin_key) = &config.security.admin_api_key {
        keys.bootstrap_admin(admin_key);
        tracing::info!("Registered admin API key from configuration");
    }

    let limiter = Arc::new(SlidingWindowLimiter::new(
        config.security.rate_limit_window_secs,
    ));

    // Backends: remote TorchScript server first, in-process ONNX as
    // fallback. Both load lazily on first use.
    let backends = BackendSet::new(
        Arc::new(TorchServingEngine::new(
            &config.model.torch_base_url,
            &config.model.torch_model_name,
        )),
        Arc::new(OnnxEngine::new(&config.model.onnx_path)),
    );

    let cors = cors_layer(&config.api.cors_origins);
    let addr = format!("{}:{}", config.api.host, config.api.port);

    let state = Arc::new(AppState::new(config, keys, limiter, backends));

    let app = routes::app(state)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(middleware::from_fn(logging::request_id))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
