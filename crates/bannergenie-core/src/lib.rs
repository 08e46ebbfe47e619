//! Design orchestration for BannerGenie.
//!
//! This crate defines the ports (`RenderClient`, `ImageHost`,
//! `ModificationParser`, `DecisionMaker`, `LlmProvider`) that the
//! infrastructure layer implements, plus everything that drives them: the
//! modification set, the template catalog cache, the completion poller, the
//! design session and the free-form design assistant. It depends only on
//! `bannergenie-types`, never on `bannergenie-infra` or any HTTP crate.

pub mod assist;
pub mod catalog;
pub mod llm;
pub mod modification;
pub mod nlu;
pub mod render;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;
