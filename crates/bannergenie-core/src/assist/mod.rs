//! Free-form design assistant.
//!
//! In assistant mode the user never picks a template or names a layer. Each
//! message goes to a [`DecisionMaker`], which answers with one
//! [`DesignDecision`]: modify the design (optionally switching template),
//! render it, start over, or just talk. [`DesignAssistant`] applies that
//! decision to a design session, re-validating every proposed edit.

pub mod assistant;
pub mod llm_decider;

use std::fmt;
use std::str::FromStr;

use bannergenie_types::error::DesignError;
use bannergenie_types::modification::Modification;
use bannergenie_types::template::{LayerKind, Template};

pub use assistant::{AssistTurn, DesignAssistant};
pub use llm_decider::LlmDecisionMaker;

/// What the assistant decided to do with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistAction {
    /// Stage edits, selecting or switching template first if asked.
    Modify,
    /// Render the current design.
    Generate,
    /// Forget the current design.
    Reset,
    /// Reply only.
    Converse,
}

impl fmt::Display for AssistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssistAction::Modify => "MODIFY",
            AssistAction::Generate => "GENERATE",
            AssistAction::Reset => "RESET",
            AssistAction::Converse => "CONVERSE",
        };
        f.write_str(name)
    }
}

impl FromStr for AssistAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MODIFY" => Ok(AssistAction::Modify),
            "GENERATE" => Ok(AssistAction::Generate),
            "RESET" => Ok(AssistAction::Reset),
            "CONVERSE" => Ok(AssistAction::Converse),
            other => Err(format!("unknown assistant action '{other}'")),
        }
    }
}

/// One layer change the decision maker wants. Unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedEdit {
    pub layer_name: String,
    pub kind: LayerKind,
    pub value: String,
}

impl ProposedEdit {
    pub fn new(layer_name: impl Into<String>, kind: LayerKind, value: impl Into<String>) -> Self {
        Self {
            layer_name: layer_name.into(),
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignDecision {
    pub action: AssistAction,
    /// Template to design on. Only read for [`AssistAction::Modify`].
    pub template_uid: Option<String>,
    pub edits: Vec<ProposedEdit>,
    /// Message to show the user.
    pub reply: String,
}

impl DesignDecision {
    pub fn converse(reply: impl Into<String>) -> Self {
        Self {
            action: AssistAction::Converse,
            template_uid: None,
            edits: Vec::new(),
            reply: reply.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// Everything a decision maker may look at for one message.
#[derive(Debug, Clone, Copy)]
pub struct AssistContext<'a> {
    pub request: &'a str,
    pub catalog: &'a [Template],
    pub current_template: Option<&'a str>,
    pub current_modifications: &'a [Modification],
    /// Recent turns, oldest first, excluding `request`.
    pub history: &'a [ChatTurn],
}

/// Port to whatever turns a message into a [`DesignDecision`].
pub trait DecisionMaker: Send + Sync {
    fn decide(
        &self,
        context: &AssistContext<'_>,
    ) -> impl std::future::Future<Output = Result<DesignDecision, DesignError>> + Send;
}
