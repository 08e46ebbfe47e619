//! Natural-language change requests.
//!
//! A `ModificationParser` maps free text like "make the headline say Summer
//! Sale" onto one template layer. Its output is untrusted: the design
//! session re-validates the layer, kind and value against the live template
//! before anything is staged.

pub mod llm_parser;

use bannergenie_types::error::DesignError;
use bannergenie_types::template::{LayerDescriptor, LayerKind};

pub use llm_parser::LlmModificationParser;

/// One structured change extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModification {
    pub layer_name: String,
    pub kind: LayerKind,
    pub value: String,
}

/// Port to whatever understands change requests.
pub trait ModificationParser: Send + Sync {
    fn parse(
        &self,
        free_text: &str,
        available_layers: &[LayerDescriptor],
    ) -> impl std::future::Future<Output = Result<ParsedModification, DesignError>> + Send;
}
