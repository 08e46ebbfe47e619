//! Async line input for the chat loop.

use console::style;
use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug)]
pub enum InputEvent {
    Line(String),
    /// Ctrl+D.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
    prompt: String,
}

/// Prompt showing the working template and any layer awaiting an upload.
pub fn prompt_for(template_name: Option<&str>, pending_upload: Option<&str>) -> String {
    let context = match (template_name, pending_upload) {
        (Some(name), Some(layer)) => format!("{name} · waiting for {layer} upload"),
        (Some(name), None) => name.to_string(),
        (None, _) => "no template".to_string(),
    };
    format!("  {} {} ", style(format!("[{context}]")).dim(), style("You >").green().bold())
}

impl ChatInput {
    pub fn new() -> Result<(Self, SharedWriter), ReadlineError> {
        let prompt = prompt_for(None, None);
        let (rl, writer) = Readline::new(prompt.clone())?;
        Ok((Self { rl, prompt }, writer))
    }

    /// Refresh the prompt; a no-op when nothing changed.
    pub fn set_prompt(&mut self, prompt: String) {
        if prompt != self.prompt {
            let _ = self.rl.update_prompt(&prompt);
            self.prompt = prompt;
        }
    }

    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let line = line.trim().to_string();
                if !line.is_empty() {
                    self.rl.add_history_entry(line.clone());
                }
                InputEvent::Line(line)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(err) => {
                tracing::debug!(error = %err, "readline failed, ending chat");
                InputEvent::Eof
            }
        }
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    #[test]
    fn prompt_reflects_session() {
        assert_eq!(plain(&prompt_for(None, None)), "  [no template] You > ");
        assert_eq!(plain(&prompt_for(Some("Summer Sale"), None)), "  [Summer Sale] You > ");
        assert_eq!(
            plain(&prompt_for(Some("Summer Sale"), Some("photo"))),
            "  [Summer Sale · waiting for photo upload] You > "
        );
    }
}
