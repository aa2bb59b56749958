//! Prediction request and response types.
//!
//! Field names follow the wire contract of the exported BST model:
//! `JnB` (joints and bones), `shuttle`, `pos`, `video_len`.

use serde::{Deserialize, Serialize};

/// One inference request: pose and trajectory features for a batch of
/// rally clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSequenceRequest {
    /// Pose features, `[batch][time][people][feature]`.
    #[serde(rename = "JnB")]
    pub jnb: Vec<Vec<Vec<Vec<f32>>>>,
    /// Shuttle trajectory, `[batch][time][2]`.
    pub shuttle: Vec<Vec<Vec<f32>>>,
    /// Player court positions, `[batch][time][people][2]`.
    pub pos: Vec<Vec<Vec<Vec<f32>>>>,
    /// Valid frame count per clip, `[batch]`, each entry <= time.
    pub video_len: Vec<i64>,
}

/// Top-k classes per batch row, sorted descending by probability.
/// Equal probabilities keep the lower class index first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPredictions {
    pub indices: Vec<Vec<usize>>,
    pub probabilities: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionMetadata {
    /// Identifier of the backend that served the request.
    pub model_type: String,
    pub batch_size: usize,
    pub seq_len: usize,
    pub n_classes: usize,
}

/// Caller metadata echoed on authenticated responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    pub api_key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_remaining: Option<u32>,
}

/// Successful prediction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    /// Backend inference time in seconds.
    pub inference_time: f64,
    /// Raw class scores, `[batch][n_classes]`.
    pub predictions: Vec<Vec<f32>>,
    /// Softmax of the scores, `[batch][n_classes]`.
    pub probabilities: Vec<Vec<f32>>,
    pub top_predictions: TopPredictions,
    pub metadata: PredictionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<AuthInfo>,
}
