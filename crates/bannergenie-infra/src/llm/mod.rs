//! LLM provider implementations and the provider factory.

pub mod openai_compat;

use secrecy::{ExposeSecret, SecretString};

use bannergenie_core::llm::box_provider::BoxLlmProvider;
use bannergenie_types::config::LlmConfig;
use bannergenie_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Build the configured provider.
///
/// A configured `base_url` overrides the provider's default endpoint.
/// Unknown provider names are rejected rather than silently redirected.
pub fn create_provider(
    config: &LlmConfig,
    api_key: &SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.expose_secret();
    if key.is_empty() {
        return Err(LlmError::AuthenticationFailed);
    }

    let mut oai_config = match config.provider.as_str() {
        "gemini" => openai_compat::config::gemini_defaults(key, &config.model),
        "openai" => openai_compat::config::openai_defaults(key, &config.model),
        other => {
            return Err(LlmError::InvalidRequest(format!(
                "unknown LLM provider '{other}' (expected 'gemini' or 'openai')"
            )));
        }
    };
    if let Some(base_url) = config.base_url.as_deref() {
        oai_config = OpenAiCompatConfig {
            base_url: base_url.to_string(),
            ..oai_config
        };
    }

    tracing::debug!(
        provider = %oai_config.provider_name,
        model = %oai_config.model,
        "creating LLM provider"
    );
    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
}
