//! Remote TorchScript model server backend.
//!
//! Talks to a model server hosting the TorchScript export. Requests
//! carry the validated tensors as JSON; the server answers with the
//! raw score matrix. Calls are bounded by a 30 second client timeout,
//! after which the request counts as a backend failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{BackendAvailability, InferenceEngine};
use crate::error::{Error, Result};
use crate::validate::ValidatedInput;

const ENGINE_TYPE: &str = "torchscript";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TorchServingEngine {
    http_client: Client,
    base_url: String,
    model_name: String,
}

impl TorchServingEngine {
    pub fn new(base_url: &str, model_name: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
        }
    }

    fn predictions_url(&self) -> String {
        format!("{}/predictions/{}", self.base_url, self.model_name)
    }
}

#[async_trait]
impl InferenceEngine for TorchServingEngine {
    fn engine_type(&self) -> &'static str {
        ENGINE_TYPE
    }

    async fn availability(&self) -> BackendAvailability {
        let reachable = self
            .http_client
            .get(format!("{}/ping", self.base_url))
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false);

        BackendAvailability {
            configured: self.base_url.clone(),
            available: reachable,
            loaded: reachable,
        }
    }

    async fn infer(&self, input: &ValidatedInput<'_>) -> Result<Vec<Vec<f32>>> {
        let response = self
            .http_client
            .post(self.predictions_url())
            .timeout(REQUEST_TIMEOUT)
            .json(input.request)
            .send()
            .await
            .map_err(|e| Error::inference(ENGINE_TYPE, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::inference(
                ENGINE_TYPE,
                format!("model server returned {status}: {detail}"),
            ));
        }

        let scores: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| Error::inference(ENGINE_TYPE, format!("invalid score payload: {e}")))?;

        if scores.len() != input.batch_size {
            return Err(Error::inference(
                ENGINE_TYPE,
                format!(
                    "expected {} score rows, got {}",
                    input.batch_size,
                    scores.len()
                ),
            ));
        }

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::validate::validate;
    use bst_common::PoseSequenceRequest;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tiny_model() -> ModelConfig {
        ModelConfig {
            n_people: 1,
            pose_features: 2,
            n_classes: 3,
            ..ModelConfig::default()
        }
    }

    fn tiny_request() -> PoseSequenceRequest {
        PoseSequenceRequest {
            jnb: vec![vec![vec![vec![0.1, 0.2]]]],
            shuttle: vec![vec![vec![0.3, 0.4]]],
            pos: vec![vec![vec![vec![0.5, 0.6]]]],
            video_len: vec![1],
        }
    }

    #[tokio::test]
    async fn test_infer_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions/bst"))
            .and(body_partial_json(serde_json::json!({
                "video_len": [1]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(vec![vec![0.1f32, 0.7, 0.2]]),
            )
            .mount(&server)
            .await;

        let engine = TorchServingEngine::new(&server.uri(), "bst");
        let request = tiny_request();
        let input = validate(&request, &tiny_model()).unwrap();

        let scores = engine.infer(&input).await.unwrap();
        assert_eq!(scores, vec![vec![0.1, 0.7, 0.2]]);
    }

    #[tokio::test]
    async fn test_infer_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions/bst"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let engine = TorchServingEngine::new(&server.uri(), "bst");
        let request = tiny_request();
        let input = validate(&request, &tiny_model()).unwrap();

        let error = engine.infer(&input).await.unwrap_err();
        assert!(matches!(error, Error::InferenceFailed { .. }));
        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_infer_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions/bst"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let engine = TorchServingEngine::new(&server.uri(), "bst");
        let request = tiny_request();
        let input = validate(&request, &tiny_model()).unwrap();

        assert!(engine.infer(&input).await.is_err());
    }

    #[tokio::test]
    async fn test_infer_row_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions/bst"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vec![vec![0.1f32], vec![0.2f32]]),
            )
            .mount(&server)
            .await;

        let engine = TorchServingEngine::new(&server.uri(), "bst");
        let request = tiny_request();
        let input = validate(&request, &tiny_model()).unwrap();

        let error = engine.infer(&input).await.unwrap_err();
        assert!(error.to_string().contains("score rows"));
    }

    #[tokio::test]
    async fn test_availability_reports_unreachable() {
        // Nothing listening on this port.
        let engine = TorchServingEngine::new("http://127.0.0.1:1", "bst");
        let availability = engine.availability().await;
        assert!(!availability.available);
        assert!(!availability.loaded);
    }
}
