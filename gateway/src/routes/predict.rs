//! Prediction orchestration.
//!
//! The request pipeline is strictly ordered: shape validation, then
//! authentication, then rate admission, then the permission check,
//! and only then any backend call. Rejected requests never touch a
//! backend, and an unrecognized caller never consumes quota. Once
//! admitted, the quota slot stays consumed even if the client
//! disconnects before the response is delivered.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bst_common::{
    AuthInfo, Permission, PoseSequenceRequest, PredictionMetadata, PredictionResponse,
};

use crate::auth::{authorize, AuthContext};
use crate::engine::{InferenceEngine, InferenceOutcome};
use crate::error::{Error, Result};
use crate::postprocess::{softmax, top_k, TOP_K};
use crate::validate::{validate, ValidatedInput};
use crate::AppState;

async fn run_backend(
    engine: &Arc<dyn InferenceEngine>,
    input: &ValidatedInput<'_>,
) -> Result<InferenceOutcome> {
    let start = Instant::now();
    let scores = engine.infer(input).await?;
    Ok(InferenceOutcome {
        backend: engine.engine_type(),
        scores,
        elapsed: start.elapsed(),
    })
}

/// Try the primary backend; on failure, one attempt against the
/// secondary. The secondary's error is terminal.
async fn infer_with_fallback(
    state: &AppState,
    input: &ValidatedInput<'_>,
) -> Result<InferenceOutcome> {
    match run_backend(state.backends.primary(), input).await {
        Ok(outcome) => Ok(outcome),
        Err(primary_error) => {
            tracing::warn!(
                backend = state.backends.primary().engine_type(),
                error = %primary_error,
                "primary backend failed, falling back"
            );
            run_backend(state.backends.secondary(), input).await
        }
    }
}

fn assemble_response(
    outcome: InferenceOutcome,
    input: &ValidatedInput<'_>,
    state: &AppState,
    auth: &AuthContext,
) -> PredictionResponse {
    let n_classes = state.config.model.n_classes;
    let probabilities = softmax(&outcome.scores);
    let top_predictions = top_k(&probabilities, TOP_K.min(n_classes));

    let auth_info = state
        .config
        .security
        .require_auth
        .then(|| AuthInfo {
            api_key_name: auth.key_name.clone(),
            rate_limit_remaining: auth.rate_limit_remaining(),
        });

    PredictionResponse {
        success: true,
        inference_time: outcome.elapsed.as_secs_f64(),
        predictions: outcome.scores,
        probabilities,
        top_predictions,
        metadata: PredictionMetadata {
            model_type: outcome.backend.to_string(),
            batch_size: input.batch_size,
            seq_len: input.seq_len,
            n_classes,
        },
        auth_info,
    }
}

/// POST /predict - full pipeline with automatic fallback.
async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PoseSequenceRequest>,
) -> Result<Json<PredictionResponse>> {
    let input = validate(&request, &state.config.model)?;
    let auth = authorize(
        &headers,
        &state.config.security,
        state.keys.as_ref(),
        state.limiter.as_ref(),
    )?;
    auth.require(Permission::Predict)?;

    let outcome = infer_with_fallback(&state, &input).await?;
    Ok(Json(assemble_response(outcome, &input, &state, &auth)))
}

/// POST /predict/:backend - same contract, single backend, no
/// fallback.
async fn predict_with_backend(
    State(state): State<Arc<AppState>>,
    Path(backend): Path<String>,
    headers: HeaderMap,
    Json(request): Json<PoseSequenceRequest>,
) -> Result<Json<PredictionResponse>> {
    let input = validate(&request, &state.config.model)?;
    let auth = authorize(
        &headers,
        &state.config.security,
        state.keys.as_ref(),
        state.limiter.as_ref(),
    )?;
    auth.require(Permission::Predict)?;

    let engine = state
        .backends
        .get(&backend)
        .ok_or(Error::UnknownBackend(backend))?;
    let outcome = run_backend(engine, &input).await?;
    Ok(Json(assemble_response(outcome, &input, &state, &auth)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict/:backend", post(predict_with_backend))
        .with_state(state)
}
