//! Configuration file shape.
//!
//! `AppConfig` is the top-level `config.toml` in the data directory. Every
//! field has a default, so an empty or missing file is a valid config.
//! Credentials never live here; they come from the environment.

use serde::{Deserialize, Serialize};

/// Top-level configuration for BannerGenie.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bannerbear: BannerbearConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Render service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerbearConfig {
    #[serde(default = "default_bannerbear_base_url")]
    pub base_url: String,
    /// Per-request timeout. Synchronous renders can take a while.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long a template listing stays cached per credential.
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,
}

fn default_bannerbear_base_url() -> String {
    "https://api.bannerbear.com/v2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_catalog_ttl_secs() -> u64 {
    3600
}

impl Default for BannerbearConfig {
    fn default() -> Self {
        Self {
            base_url: default_bannerbear_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
        }
    }
}

/// Completion polling bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_poll_max_attempts() -> u32 {
    20
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

/// Image host used for `/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
}

fn default_upload_endpoint() -> String {
    "https://freeimage.host/api/1/upload".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
        }
    }
}

/// Language model used to interpret change requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `gemini` or `openai`.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Override the provider's default OpenAI-compatible endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}

fn default_llm_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.bannerbear.base_url, "https://api.bannerbear.com/v2");
        assert_eq!(config.bannerbear.catalog_ttl_secs, 3600);
        assert_eq!(config.polling.interval_secs, 3);
        assert_eq!(config.polling.max_attempts, 20);
        assert_eq!(config.llm.provider, "gemini");
        assert!(config.llm.base_url.is_none());
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.polling.max_attempts, 20);
        assert_eq!(config.upload.endpoint, "https://freeimage.host/api/1/upload");
    }

    #[test]
    fn test_app_config_deserialize_partial_sections() {
        let toml_str = r#"
[polling]
interval_secs = 1

[llm]
provider = "openai"
model = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.polling.interval_secs, 1);
        assert_eq!(config.polling.max_attempts, 20);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.bannerbear.request_timeout_secs, 60);
    }

    #[test]
    fn test_app_config_serialize_roundtrip() {
        let mut config = AppConfig::default();
        config.bannerbear.base_url = "http://localhost:9000".to_string();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bannerbear.base_url, "http://localhost:9000");
    }
}
