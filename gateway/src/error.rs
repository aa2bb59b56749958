//! Error types for the gateway.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bst_common::Permission;
use chrono::{DateTime, Utc};
use serde_json::json;

/// Error taxonomy for gateway operations.
///
/// Validation and authentication errors are terminal for a request;
/// a backend failure is terminal only after the fallback attempt.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field} shape mismatch. Expected {expected}, got {actual}")]
    ShapeMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("API key required. Provide via X-API-Key header.")]
    MissingApiKey,

    #[error("Invalid or disabled API key")]
    InvalidApiKey,

    #[error("Insufficient permissions: {0} required")]
    PermissionDenied(Permission),

    #[error("Rate limit exceeded")]
    QuotaExceeded {
        used: u32,
        quota: u32,
        reset_at: DateTime<Utc>,
    },

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("{backend} inference failed: {message}")]
    InferenceFailed { backend: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn inference(backend: &str, message: impl std::fmt::Display) -> Self {
        Error::InferenceFailed {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::ShapeMismatch { .. } => (StatusCode::BAD_REQUEST, "shape_mismatch"),
            Error::MissingApiKey => (StatusCode::UNAUTHORIZED, "authentication_failed"),
            Error::InvalidApiKey => (StatusCode::UNAUTHORIZED, "authentication_failed"),
            Error::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            Error::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            Error::UnknownBackend(_) => (StatusCode::NOT_FOUND, "unknown_backend"),
            Error::InferenceFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "inference_failed")
            }
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let mut body = json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        });

        match &self {
            Error::ShapeMismatch {
                field,
                expected,
                actual,
            } => {
                body["error"]["field"] = json!(field);
                body["error"]["expected"] = json!(expected);
                body["error"]["actual"] = json!(actual);
            }
            Error::QuotaExceeded {
                used,
                quota,
                reset_at,
            } => {
                body["error"]["rate_limit"] = json!({
                    "requests_made": used,
                    "requests_limit": quota,
                    "reset_time": reset_at.to_rfc3339(),
                });
            }
            Error::InferenceFailed { backend, .. } => {
                body["error"]["backend"] = json!(backend);
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();

        if let Error::QuotaExceeded {
            used,
            quota,
            reset_at,
        } = &self
        {
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&quota.to_string()) {
                headers.insert("X-RateLimit-Limit", value);
            }
            let remaining = quota.saturating_sub(*used);
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("X-RateLimit-Remaining", value);
            }
            if let Ok(value) = HeaderValue::from_str(&reset_at.to_rfc3339()) {
                headers.insert("X-RateLimit-Reset", value);
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_carries_rate_limit_headers() {
        let error = Error::QuotaExceeded {
            used: 100,
            quota: 100,
            reset_at: Utc::now(),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("X-RateLimit-Limit").unwrap(),
            "100"
        );
        assert_eq!(
            response.headers().get("X-RateLimit-Remaining").unwrap(),
            "0"
        );
        assert!(response.headers().get("X-RateLimit-Reset").is_some());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::MissingApiKey.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::PermissionDenied(Permission::Admin)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::UnknownBackend("tflite".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::inference("onnx", "model not found")
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
