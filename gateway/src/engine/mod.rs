//! Inference backend abstraction.
//!
//! Two interchangeable backends sit behind the `InferenceEngine`
//! trait: the remote TorchScript model server (primary) and the
//! in-process ONNX session (secondary). They share the logical
//! input/output contract but are not required to produce bit-identical
//! scores.

mod onnx;
mod torch;

pub use onnx::OnnxEngine;
pub use torch::TorchServingEngine;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::validate::ValidatedInput;

/// Availability snapshot for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BackendAvailability {
    /// Artifact path or upstream URL the backend is configured with.
    pub configured: String,
    pub available: bool,
    pub loaded: bool,
}

/// Result of one successful backend call.
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    pub backend: &'static str,
    /// Raw class scores, `[batch][n_classes]`.
    pub scores: Vec<Vec<f32>>,
    pub elapsed: Duration,
}

/// One concrete numeric inference engine.
///
/// `infer` is stateless given the loaded model and reports failures
/// as `Err`, never panics; the orchestrator decides whether a failure
/// triggers fallback.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Unique identifier for this engine (e.g. "torchscript", "onnx").
    fn engine_type(&self) -> &'static str;

    async fn availability(&self) -> BackendAvailability;

    async fn infer(&self, input: &ValidatedInput<'_>) -> Result<Vec<Vec<f32>>>;
}

/// The primary/secondary backend pair.
#[derive(Clone)]
pub struct BackendSet {
    primary: Arc<dyn InferenceEngine>,
    secondary: Arc<dyn InferenceEngine>,
}

impl BackendSet {
    pub fn new(primary: Arc<dyn InferenceEngine>, secondary: Arc<dyn InferenceEngine>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &Arc<dyn InferenceEngine> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn InferenceEngine> {
        &self.secondary
    }

    /// Resolve a backend by its identifier, for the targeted predict
    /// endpoints.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn InferenceEngine>> {
        if self.primary.engine_type() == name {
            Some(&self.primary)
        } else if self.secondary.engine_type() == name {
            Some(&self.secondary)
        } else {
            None
        }
    }

    pub fn all(&self) -> [&Arc<dyn InferenceEngine>; 2] {
        [&self.primary, &self.secondary]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockEngine;

    #[test]
    fn test_backend_lookup_by_name() {
        let set = BackendSet::new(
            Arc::new(MockEngine::ok("torchscript", 4)),
            Arc::new(MockEngine::ok("onnx", 4)),
        );

        assert_eq!(set.get("torchscript").unwrap().engine_type(), "torchscript");
        assert_eq!(set.get("onnx").unwrap().engine_type(), "onnx");
        assert!(set.get("tflite").is_none());
    }
}
