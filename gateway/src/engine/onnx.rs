//! In-process ONNX Runtime backend.
//!
//! The session over the exported model is loaded lazily on first use
//! and cached for the process lifetime; the `OnceCell` guard ensures
//! concurrent first requests trigger a single load. Session access is
//! serialized behind a mutex and runs on the blocking pool.
//!
//! Tensor names follow the export contract: inputs `JnB`, `shuttle`,
//! `pos`, `video_len`; output `shot_predictions`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokio::sync::OnceCell;

use super::{BackendAvailability, InferenceEngine};
use crate::error::{Error, Result};
use crate::validate::ValidatedInput;

const ENGINE_TYPE: &str = "onnx";

pub struct OnnxEngine {
    model_path: PathBuf,
    session: OnceCell<Arc<Mutex<Session>>>,
}

impl OnnxEngine {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            session: OnceCell::new(),
        }
    }

    async fn session(&self) -> Result<Arc<Mutex<Session>>> {
        self.session
            .get_or_try_init(|| async {
                let path = self.model_path.clone();
                tracing::info!(path = %path.display(), "loading ONNX model");
                tokio::task::spawn_blocking(move || load_session(&path))
                    .await
                    .map_err(|e| Error::Internal(format!("session load task failed: {e}")))?
                    .map(|session| Arc::new(Mutex::new(session)))
            })
            .await
            .cloned()
    }
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(Error::inference(
            ENGINE_TYPE,
            format!("model not found: {}", path.display()),
        ));
    }

    let model_bytes = std::fs::read(path)
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("read model file: {e}")))?;

    Session::builder()
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("optimization level: {e}")))?
        .commit_from_memory(model_bytes.as_slice())
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("load model: {e}")))
}

struct OwnedInput {
    jnb: (Vec<usize>, Vec<f32>),
    shuttle: (Vec<usize>, Vec<f32>),
    pos: (Vec<usize>, Vec<f32>),
    video_len: Vec<i64>,
    batch_size: usize,
}

fn run_session(session: &Arc<Mutex<Session>>, input: OwnedInput) -> Result<Vec<Vec<f32>>> {
    let tensor_err = |e| Error::inference(ENGINE_TYPE, format!("tensor: {e}"));

    let jnb = Tensor::from_array((input.jnb.0, input.jnb.1.into_boxed_slice()))
        .map_err(tensor_err)?;
    let shuttle = Tensor::from_array((input.shuttle.0, input.shuttle.1.into_boxed_slice()))
        .map_err(tensor_err)?;
    let pos = Tensor::from_array((input.pos.0, input.pos.1.into_boxed_slice()))
        .map_err(tensor_err)?;
    let video_len = Tensor::from_array((
        vec![input.batch_size],
        input.video_len.into_boxed_slice(),
    ))
    .map_err(tensor_err)?;

    let mut session = session
        .lock()
        .map_err(|_| Error::Internal("ONNX session lock poisoned".to_string()))?;

    let outputs = session
        .run(ort::inputs![
            "JnB" => jnb,
            "shuttle" => shuttle,
            "pos" => pos,
            "video_len" => video_len,
        ])
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("run failed: {e}")))?;

    let output = outputs.get("shot_predictions").ok_or_else(|| {
        Error::inference(ENGINE_TYPE, "model output 'shot_predictions' missing")
    })?;

    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::inference(ENGINE_TYPE, format!("extract scores: {e}")))?;

    if shape.len() != 2 || shape[0] as usize != input.batch_size {
        return Err(Error::inference(
            ENGINE_TYPE,
            format!("unexpected score shape: {shape:?}"),
        ));
    }

    let n_classes = shape[1] as usize;
    Ok(data
        .chunks(n_classes)
        .map(|row| row.to_vec())
        .collect())
}

#[async_trait]
impl InferenceEngine for OnnxEngine {
    fn engine_type(&self) -> &'static str {
        ENGINE_TYPE
    }

    async fn availability(&self) -> BackendAvailability {
        BackendAvailability {
            configured: self.model_path.display().to_string(),
            available: self.model_path.exists(),
            loaded: self.session.get().is_some(),
        }
    }

    async fn infer(&self, input: &ValidatedInput<'_>) -> Result<Vec<Vec<f32>>> {
        let session = self.session().await?;

        let owned = OwnedInput {
            jnb: (
                vec![
                    input.batch_size,
                    input.seq_len,
                    input.n_people,
                    input.pose_features,
                ],
                input.jnb_flat(),
            ),
            shuttle: (
                vec![input.batch_size, input.seq_len, 2],
                input.shuttle_flat(),
            ),
            pos: (
                vec![input.batch_size, input.seq_len, input.n_people, 2],
                input.pos_flat(),
            ),
            video_len: input.request.video_len.clone(),
            batch_size: input.batch_size,
        };

        tokio::task::spawn_blocking(move || run_session(&session, owned))
            .await
            .map_err(|e| Error::Internal(format!("inference task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_artifact_is_backend_failure() {
        let engine = OnnxEngine::new("/nonexistent/bst.onnx");
        let request = bst_common::PoseSequenceRequest {
            jnb: vec![vec![vec![vec![0.0; 2]]]],
            shuttle: vec![vec![vec![0.0; 2]]],
            pos: vec![vec![vec![vec![0.0; 2]]]],
            video_len: vec![1],
        };
        let model = crate::config::ModelConfig {
            n_people: 1,
            pose_features: 2,
            ..crate::config::ModelConfig::default()
        };
        let input = crate::validate::validate(&request, &model).unwrap();

        let error = engine.infer(&input).await.unwrap_err();
        assert!(matches!(error, Error::InferenceFailed { .. }));
        assert!(error.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn test_availability_without_artifact() {
        let engine = OnnxEngine::new("/nonexistent/bst.onnx");
        let availability = engine.availability().await;
        assert!(!availability.available);
        assert!(!availability.loaded);
    }
}
