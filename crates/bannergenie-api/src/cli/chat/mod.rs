//! Interactive design chat.
//!
//! In command mode, typed commands drive a single design session and any
//! other text is handed to the language model as one change request. In
//! assistant mode, free text goes to the design assistant, which picks
//! templates and stages several edits per message. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;

/// How free text is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// One change request per message against the selected template.
    Commands,
    /// The design assistant decides what to do with each message.
    Assistant,
}

impl ChatMode {
    pub fn toggled(self) -> Self {
        match self {
            ChatMode::Commands => ChatMode::Assistant,
            ChatMode::Assistant => ChatMode::Commands,
        }
    }
}
