//! LLM-backed modification parser.
//!
//! Prompts the model for exactly one JSON object with `layer_name`,
//! `modification_type` and `new_value`. Models routinely wrap JSON in a
//! markdown fence, so that is stripped before parsing.

use serde::Deserialize;

use bannergenie_types::error::DesignError;
use bannergenie_types::llm::{CompletionRequest, LlmError};
use bannergenie_types::modification::PENDING_UPLOAD;
use bannergenie_types::template::{LayerDescriptor, LayerKind};

use super::{ModificationParser, ParsedModification};
use crate::llm::box_provider::BoxLlmProvider;

const PARSER_SYSTEM_PROMPT: &str = r##"You help a user modify a banner template. Map the user's request onto exactly one of the available template layers.

Determine:
1. "layer_name": the exact name of the layer the user most likely means, copied from the list of available layers.
2. "modification_type": one of "text", "image_url" or "color", matching that layer's type.
3. "new_value": the new value.
   - For "text", the new text.
   - For "image_url", the URL the user gave. If the user wants to change an image but gives no URL, use "USER_UPLOAD_PENDING".
   - For "color", a hex code such as "#FF0000". Translate color names into a common hex code.

Output ONLY a single JSON object with those three keys. No other text, no explanations, no markdown.

Example:
Request: "Change the headline to 'Summer Sale!'"
Layers:
- headline (text)
- main_image (image)
Output: {"layer_name": "headline", "modification_type": "text", "new_value": "Summer Sale!"}

Example:
Request: "I want a different main_image"
Layers:
- main_image (image)
Output: {"layer_name": "main_image", "modification_type": "image_url", "new_value": "USER_UPLOAD_PENDING"}"##;

#[derive(Debug, Deserialize)]
struct RawParsedModification {
    layer_name: String,
    modification_type: String,
    new_value: String,
}

/// Parser that asks a language model.
pub struct LlmModificationParser {
    provider: BoxLlmProvider,
    model: String,
}

impl LlmModificationParser {
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    fn build_request(&self, free_text: &str, layers: &[LayerDescriptor]) -> CompletionRequest {
        let layer_lines = layers
            .iter()
            .map(|l| format!("- {} ({})", l.name, l.kind))
            .collect::<Vec<_>>()
            .join("\n");

        CompletionRequest::new(
            PARSER_SYSTEM_PROMPT,
            format!("Request: \"{free_text}\"\nLayers:\n{layer_lines}"),
        )
        .with_model(self.model.clone())
        .with_temperature(0.0)
    }
}

/// Strip an optional ```json / ``` fence around the model output.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse and shape-check the model's reply.
pub(crate) fn parse_reply(raw: &str) -> Result<ParsedModification, DesignError> {
    let json = strip_code_fence(raw);
    let parsed: RawParsedModification = serde_json::from_str(json).map_err(|e| {
        let preview: String = json.chars().take(200).collect();
        tracing::warn!(
            error = %e,
            content_preview = %preview,
            "model reply is not the expected JSON object"
        );
        DesignError::ParseFailure(format!("the model returned an unexpected reply ({e})"))
    })?;

    let layer_name = parsed.layer_name.trim().to_string();
    if layer_name.is_empty() {
        return Err(DesignError::ParseFailure(
            "the model did not name a layer".to_string(),
        ));
    }
    let kind: LayerKind = parsed
        .modification_type
        .parse()
        .map_err(DesignError::ParseFailure)?;
    let value = parsed.new_value.trim().to_string();
    if value.is_empty() {
        return Err(DesignError::ParseFailure(
            "the model did not give a new value".to_string(),
        ));
    }
    if kind == LayerKind::Image && value != PENDING_UPLOAD && !value.starts_with("http") {
        return Err(DesignError::ParseFailure(format!(
            "'{value}' is not an image URL"
        )));
    }

    Ok(ParsedModification {
        layer_name,
        kind,
        value,
    })
}

fn map_llm_error(err: LlmError) -> DesignError {
    DesignError::ParseFailure(format!("language model unavailable: {err}"))
}

impl ModificationParser for LlmModificationParser {
    #[tracing::instrument(
        name = "parse_modification",
        skip(self, free_text, available_layers),
        fields(provider = self.provider.name(), layer_count = available_layers.len())
    )]
    async fn parse(
        &self,
        free_text: &str,
        available_layers: &[LayerDescriptor],
    ) -> Result<ParsedModification, DesignError> {
        if available_layers.is_empty() {
            return Err(DesignError::ParseFailure(
                "this template has no editable layers".to_string(),
            ));
        }
        let request = self.build_request(free_text, available_layers);
        let response = self.provider.complete(&request).await.map_err(map_llm_error)?;
        parse_reply(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bannergenie_types::llm::CompletionResponse;

    use super::*;
    use crate::llm::provider::LlmProvider;

    struct CannedProvider {
        reply: Result<String, ()>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    model: request.model.clone(),
                    ..CompletionResponse::default()
                }),
                Err(()) => Err(LlmError::AuthenticationFailed),
            }
        }
    }

    fn parser(reply: Result<&str, ()>) -> LlmModificationParser {
        LlmModificationParser::new(
            BoxLlmProvider::new(CannedProvider {
                reply: reply.map(str::to_string),
                last_request: Mutex::new(None),
            }),
            "test-model",
        )
    }

    fn layers() -> Vec<LayerDescriptor> {
        vec![
            LayerDescriptor::new("headline", LayerKind::Text),
            LayerDescriptor::new("main_image", LayerKind::Image),
        ]
    }

    #[test]
    fn system_prompt_keeps_hex_example_and_upload_sentinel() {
        assert!(PARSER_SYSTEM_PROMPT.contains("\"#FF0000\""));
        assert!(PARSER_SYSTEM_PROMPT.contains(PENDING_UPLOAD));
        assert!(PARSER_SYSTEM_PROMPT.ends_with("\"new_value\": \"USER_UPLOAD_PENDING\"}"));
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn parse_reply_accepts_valid_object() {
        let parsed = parse_reply(
            r#"{"layer_name": "headline", "modification_type": "text", "new_value": "Summer Sale!"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ParsedModification {
                layer_name: "headline".to_string(),
                kind: LayerKind::Text,
                value: "Summer Sale!".to_string(),
            }
        );
    }

    #[test]
    fn parse_reply_rejects_missing_keys_and_bad_types() {
        assert!(matches!(
            parse_reply(r#"{"layer_name": "headline", "new_value": "x"}"#),
            Err(DesignError::ParseFailure(_))
        ));
        let bad_type =
            r#"{"layer_name": "headline", "modification_type": "font", "new_value": "x"}"#;
        assert!(matches!(
            parse_reply(bad_type),
            Err(DesignError::ParseFailure(_))
        ));
        assert!(matches!(
            parse_reply("Sure! I changed the headline."),
            Err(DesignError::ParseFailure(_))
        ));
    }

    #[test]
    fn parse_reply_checks_image_values() {
        assert!(parse_reply(
            r#"{"layer_name": "main_image", "modification_type": "image_url", "new_value": "a cat"}"#
        )
        .is_err());

        let pending = parse_reply(
            r#"{"layer_name": "main_image", "modification_type": "image_url", "new_value": "USER_UPLOAD_PENDING"}"#,
        )
        .unwrap();
        assert_eq!(pending.value, PENDING_UPLOAD);
        assert_eq!(pending.kind, LayerKind::Image);
    }

    #[tokio::test]
    async fn parse_sends_layers_and_handles_fenced_reply() {
        let parser = parser(Ok(
            "```json\n{\"layer_name\": \"main_image\", \"modification_type\": \"image_url\", \"new_value\": \"https://example.com/p.jpg\"}\n```",
        ));

        let parsed = parser
            .parse("use https://example.com/p.jpg as the photo", &layers())
            .await
            .unwrap();

        assert_eq!(parsed.layer_name, "main_image");
        assert_eq!(parsed.value, "https://example.com/p.jpg");
    }

    #[test]
    fn request_lists_layers_with_kinds() {
        let request = parser(Ok("{}")).build_request("make it pop", &layers());
        let content = &request.prompt;
        assert!(content.contains("- headline (text)"));
        assert!(content.contains("- main_image (image)"));
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn provider_errors_become_parse_failures() {
        let parser = parser(Err(()));
        let err = parser.parse("anything", &layers()).await.unwrap_err();
        assert!(matches!(err, DesignError::ParseFailure(ref m) if m.contains("rejected the API key")));
    }

    #[tokio::test]
    async fn empty_layer_list_is_rejected_without_calling_model() {
        let parser = parser(Ok("{}"));
        assert!(matches!(
            parser.parse("anything", &[]).await,
            Err(DesignError::ParseFailure(_))
        ));
    }
}
