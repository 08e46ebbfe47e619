//! Language-model request/response types.
//!
//! The model only interprets one free-form change request at a time, so a
//! request is a system instruction plus a single user prompt and the reply is
//! plain text.

/// One-shot completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model id; empty means the provider's configured default.
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 512,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text reply plus the token accounting the provider reported.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("the model provider rejected the API key")]
    AuthenticationFailed,

    #[error("the model provider is rate limiting requests")]
    RateLimited,

    #[error("could not decode the model provider's reply: {0}")]
    Decode(String),

    #[error("invalid model request: {0}")]
    InvalidRequest(String),

    #[error("model provider error: {0}")]
    Provider(String),
}
