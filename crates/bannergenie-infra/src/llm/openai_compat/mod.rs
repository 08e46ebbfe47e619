//! OpenAI-compatible LLM provider.
//!
//! Gemini exposes an OpenAI-compatible chat endpoint, so one
//! [`OpenAiCompatibleProvider`] serves both backends; only the base URL and
//! default model differ.

pub mod config;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};

use bannergenie_core::llm::provider::LlmProvider;
use bannergenie_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use self::config::OpenAiCompatConfig;

/// Chat-completions client for the parser.
///
/// Not `Debug`: the inner client holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.api_key)
                .with_api_base(&config.base_url),
        );
        Self {
            client,
            provider_name: config.provider_name,
            model: config.model,
        }
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    pub fn gemini(api_key: &str, model: &str) -> Self {
        Self::new(config::gemini_defaults(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let system = ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(request.system.clone()),
            name: None,
        });
        let user = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
            name: None,
        });

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages: vec![system, user],
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            ..Default::default()
        }
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    #[tracing::instrument(
        name = "llm.complete",
        skip(self, request),
        fields(provider = %self.provider_name)
    )]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .client
            .chat()
            .create(self.build_request(request))
            .await
            .map_err(map_openai_error)?;

        let Some(content) = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
        else {
            return Err(LlmError::Decode("reply contained no text".to_string()));
        };

        let (input_tokens, output_tokens) = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        tracing::debug!(input_tokens, output_tokens, "completion received");

        Ok(CompletionResponse {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
        })
    }
}

fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            if code == "invalid_api_key"
                || kind == "authentication_error"
                || api.message.contains("API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || kind == "rate_limit_error" {
                LlmError::RateLimited
            } else {
                LlmError::Provider(api.message)
            }
        }
        OpenAIError::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(401 | 403) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited,
            _ => LlmError::Provider(e.to_string()),
        },
        OpenAIError::JSONDeserialize(_, body) => LlmError::Decode(body),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::Provider(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest::new("map requests to layers", "make the title red")
            .with_model(model)
            .with_temperature(0.0)
    }

    #[test]
    fn factories_set_name_and_model() {
        let gemini = OpenAiCompatibleProvider::gemini("key", "gemini-1.5-flash-latest");
        assert_eq!(gemini.name(), "gemini");
        assert_eq!(gemini.model(), "gemini-1.5-flash-latest");

        let openai = OpenAiCompatibleProvider::openai("sk-test", "gpt-4o-mini");
        assert_eq!(openai.name(), "openai");
    }

    #[test]
    fn request_is_system_then_user() {
        let provider = OpenAiCompatibleProvider::gemini("key", "gemini-1.5-flash-latest");
        let built = provider.build_request(&request("gemini-1.5-flash-latest"));
        assert_eq!(built.messages.len(), 2);
        assert!(matches!(built.messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(built.messages[1], ChatCompletionRequestMessage::User(_)));
        assert_eq!(built.max_completion_tokens, Some(512));
        assert_eq!(built.temperature, Some(0.0));
    }

    #[test]
    fn empty_request_model_falls_back_to_provider_default() {
        let provider = OpenAiCompatibleProvider::openai("sk-test", "gpt-4o-mini");
        assert_eq!(provider.build_request(&request("")).model, "gpt-4o-mini");
        assert_eq!(provider.build_request(&request("gpt-4o")).model, "gpt-4o");
    }

    #[test]
    fn invalid_argument_maps_to_invalid_request() {
        let err = map_openai_error(OpenAIError::InvalidArgument("bad model".to_string()));
        assert!(matches!(err, LlmError::InvalidRequest(ref m) if m == "bad model"));
    }
}
