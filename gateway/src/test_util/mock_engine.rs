use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::engine::{BackendAvailability, InferenceEngine};
use crate::error::{Error, Result};
use crate::validate::ValidatedInput;

/// Scriptable backend with call-count instrumentation.
///
/// By default produces deterministic scores sized to the request
/// batch: class `i` scores `i as f32 * 0.1`. A fixed score matrix can
/// be scripted instead, and the engine can be flipped into a failing
/// state at any point.
pub struct MockEngine {
    name: &'static str,
    n_classes: usize,
    scripted: Option<Vec<Vec<f32>>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockEngine {
    pub fn ok(name: &'static str, n_classes: usize) -> Self {
        Self {
            name,
            n_classes,
            scripted: None,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        let engine = Self::ok(name, 0);
        engine.fail.store(true, Ordering::SeqCst);
        engine
    }

    pub fn scripted(name: &'static str, scores: Vec<Vec<f32>>) -> Self {
        Self {
            scripted: Some(scores),
            ..Self::ok(name, 0)
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `infer` calls observed, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    fn engine_type(&self) -> &'static str {
        self.name
    }

    async fn availability(&self) -> BackendAvailability {
        BackendAvailability {
            configured: format!("mock://{}", self.name),
            available: !self.fail.load(Ordering::SeqCst),
            loaded: true,
        }
    }

    async fn infer(&self, input: &ValidatedInput<'_>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::inference(self.name, "forced failure"));
        }

        if let Some(scores) = &self.scripted {
            return Ok(scores.clone());
        }

        Ok((0..input.batch_size)
            .map(|_| (0..self.n_classes).map(|c| c as f32 * 0.1).collect())
            .collect())
    }
}
