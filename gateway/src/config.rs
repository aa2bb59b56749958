//! Configuration for the gateway.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether interactive API docs are advertised.
    #[serde(default = "default_true")]
    pub enable_docs: bool,
    /// Allowed CORS origins; `*` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_docs: true,
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// When false, predict endpoints accept anonymous callers and no
    /// quota accounting is done.
    #[serde(default = "default_true")]
    pub require_auth: bool,
    /// Bootstrap admin key inserted at startup with predict + admin
    /// permissions.
    #[serde(default)]
    pub admin_api_key: Option<String>,
    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,
    /// Default quota per key per window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            admin_api_key: None,
            rate_limit_enabled: true,
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

/// Model artifact locations and the tensor dimensions the exported
/// model was traced with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Base URL of the TorchScript model server (primary backend).
    #[serde(default = "default_torch_base_url")]
    pub torch_base_url: String,
    #[serde(default = "default_torch_model_name")]
    pub torch_model_name: String,
    /// Path to the exported ONNX artifact (secondary backend).
    #[serde(default = "default_onnx_path")]
    pub onnx_path: String,
    #[serde(default = "default_n_classes")]
    pub n_classes: usize,
    #[serde(default = "default_n_people")]
    pub n_people: usize,
    #[serde(default = "default_pose_features")]
    pub pose_features: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            torch_base_url: default_torch_base_url(),
            torch_model_name: default_torch_model_name(),
            onnx_path: default_onnx_path(),
            n_classes: default_n_classes(),
            n_people: default_n_people(),
            pose_features: default_pose_features(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_true() -> bool {
    true
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_rate_limit_requests() -> u32 {
    100
}
fn default_rate_limit_window() -> u64 {
    3600
}
fn default_torch_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_torch_model_name() -> String {
    "bst".to_string()
}
fn default_onnx_path() -> String {
    "models/bst.onnx".to_string()
}
fn default_n_classes() -> usize {
    66
}
fn default_n_people() -> usize {
    2
}
fn default_pose_features() -> usize {
    72
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (BST__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("BST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let api = ApiConfig::default();
        assert_eq!(api.host, "0.0.0.0");
        assert_eq!(api.port, 8000);
        assert_eq!(api.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_default_security_config() {
        let security = SecurityConfig::default();
        assert!(security.require_auth);
        assert!(security.rate_limit_enabled);
        assert_eq!(security.rate_limit_requests, 100);
        assert_eq!(security.rate_limit_window_secs, 3600);
        assert!(security.admin_api_key.is_none());
    }

    #[test]
    fn test_default_model_dims() {
        let model = ModelConfig::default();
        assert_eq!(model.n_classes, 66);
        assert_eq!(model.n_people, 2);
        assert_eq!(model.pose_features, 72);
    }
}
