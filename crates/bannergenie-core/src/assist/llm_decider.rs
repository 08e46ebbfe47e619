//! LLM-backed decision maker.
//!
//! The model sees the full catalog with layers, the design in progress and
//! the recent transcript, and must answer with one JSON decision object.

use serde::Deserialize;
use serde_json::{Map, Value};

use bannergenie_types::error::DesignError;
use bannergenie_types::llm::{CompletionRequest, LlmError};
use bannergenie_types::template::LayerKind;

use super::{AssistContext, DecisionMaker, DesignDecision, ProposedEdit, Speaker};
use crate::llm::box_provider::BoxLlmProvider;
use crate::nlu::llm_parser::strip_code_fence;

const DECIDER_SYSTEM_PROMPT: &str = r##"You are a friendly banner design assistant. For every user message, decide on exactly ONE action.

Actions:
1. "MODIFY": start a new design or change the current one.
   - For a new design, pick the best template from AVAILABLE_TEMPLATES yourself and apply every detail the user gave. Never ask the user to choose a template.
   - If the user dislikes the current layout, pick a different template_uid. Earlier changes are carried over automatically.
   - After a MODIFY, if obvious details are still missing, ask for ONE of them in response_text.
2. "GENERATE": the user wants to see the image ("show it to me", "I'm ready").
3. "RESET": the user wants to start a completely different design.
4. "CONVERSE": greetings or a clarifying question. Prefer MODIFY whenever you can act.

Modifications use exact layer names from the chosen template and exactly one value key matching the layer type:
- text layers: "text"
- image layers: "image_url", a URL the user gave, or "USER_UPLOAD_PENDING" if they want to upload one
- color layers: "color", a hex code such as "#1E90FF"

Output ONLY a single JSON object, no markdown:
{"action": "MODIFY", "template_uid": "tpl_abc", "modifications": [{"name": "headline", "text": "Open House"}], "response_text": "Done! What's the address?"}"##;

const FALLBACK_REPLY: &str = "I'm not sure how to proceed.";

#[derive(Debug, Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    template_uid: Option<String>,
    #[serde(default)]
    modifications: Vec<Map<String, Value>>,
    #[serde(default)]
    response_text: Option<String>,
}

/// Decision maker that asks a language model.
pub struct LlmDecisionMaker {
    provider: BoxLlmProvider,
    model: String,
}

impl LlmDecisionMaker {
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    fn build_request(&self, context: &AssistContext<'_>) -> CompletionRequest {
        let catalog = serde_json::to_string_pretty(context.catalog).unwrap_or_default();
        let design = serde_json::json!({
            "template_uid": context.current_template,
            "modifications": context.current_modifications,
        });
        let transcript = context
            .history
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::User => format!("User: {}", turn.text),
                Speaker::Assistant => format!("Assistant: {}", turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "AVAILABLE_TEMPLATES:\n{catalog}\n\nCURRENT_DESIGN:\n{design:#}\n\n\
             CONVERSATION:\n{transcript}\n\nUser: {}",
            context.request
        );
        let mut request = CompletionRequest::new(DECIDER_SYSTEM_PROMPT, prompt)
            .with_model(self.model.clone())
            .with_temperature(0.2);
        request.max_tokens = 1024;
        request
    }
}

/// Turn one raw modification object into an edit, if it names a layer and
/// carries a string payload.
fn proposed_edit(raw: &Map<String, Value>) -> Option<ProposedEdit> {
    let name = raw.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let kind = LayerKind::infer(raw)?;
    let value = raw.get(kind.payload_field())?.as_str()?;
    Some(ProposedEdit::new(name, kind, value))
}

pub(crate) fn parse_decision(raw: &str) -> Result<DesignDecision, DesignError> {
    let json = strip_code_fence(raw);
    let parsed: RawDecision = serde_json::from_str(json).map_err(|e| {
        let preview: String = json.chars().take(200).collect();
        tracing::warn!(
            error = %e,
            content_preview = %preview,
            "model reply is not a decision object"
        );
        DesignError::ParseFailure(format!("the model returned an unexpected reply ({e})"))
    })?;

    let action = parsed.action.parse().map_err(DesignError::ParseFailure)?;
    let edits = parsed
        .modifications
        .iter()
        .filter_map(|raw| {
            let edit = proposed_edit(raw);
            if edit.is_none() {
                tracing::warn!(modification = ?raw, "dropping malformed modification");
            }
            edit
        })
        .collect();
    let template_uid = parsed
        .template_uid
        .map(|uid| uid.trim().to_string())
        .filter(|uid| !uid.is_empty());
    let reply = parsed
        .response_text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string());

    Ok(DesignDecision {
        action,
        template_uid,
        edits,
        reply,
    })
}

fn map_llm_error(err: LlmError) -> DesignError {
    DesignError::ParseFailure(format!("language model unavailable: {err}"))
}

impl DecisionMaker for LlmDecisionMaker {
    #[tracing::instrument(
        name = "assist.decide",
        skip(self, context),
        fields(provider = self.provider.name(), templates = context.catalog.len())
    )]
    async fn decide(&self, context: &AssistContext<'_>) -> Result<DesignDecision, DesignError> {
        let request = self.build_request(context);
        let response = self.provider.complete(&request).await.map_err(map_llm_error)?;
        let decision = parse_decision(&response.content)?;
        tracing::debug!(
            action = %decision.action,
            edits = decision.edits.len(),
            "decision parsed"
        );
        Ok(decision)
    }
}
