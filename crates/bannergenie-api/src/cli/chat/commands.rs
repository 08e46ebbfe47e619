//! Chat input classification.
//!
//! Phrases like `show templates` and slash commands like `/upload` are
//! recognized case-insensitively. Anything else is free text: a change
//! request in command mode, a message to the assistant in assistant mode.

use std::path::PathBuf;

use console::style;

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    ShowTemplates,
    /// Select by list number, uid or name.
    Select(String),
    Generate,
    GenerateWithDefaults,
    Reset,
    Upload(PathBuf),
    CancelUpload,
    Status,
    /// Download the last banner; `None` saves under the data directory.
    Save(Option<PathBuf>),
    /// Toggle assistant mode.
    Agent,
    Help,
    Clear,
    Exit,
    /// Recognized command with a missing or bad argument.
    Usage(&'static str),
    Unknown(String),
    FreeText(String),
}

/// Classify one line of input. Returns `None` for blank lines.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    if let Some(rest) = trimmed.strip_prefix('/') {
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
            None => (rest.to_lowercase(), ""),
        };
        return Some(match cmd.as_str() {
            "help" | "h" | "?" => ChatCommand::Help,
            "exit" | "quit" | "q" => ChatCommand::Exit,
            "clear" | "cls" => ChatCommand::Clear,
            "templates" => ChatCommand::ShowTemplates,
            "select" => select(arg),
            "generate" | "render" => ChatCommand::Generate,
            "defaults" => ChatCommand::GenerateWithDefaults,
            "reset" => ChatCommand::Reset,
            "cancel" => ChatCommand::CancelUpload,
            "status" => ChatCommand::Status,
            "upload" if arg.is_empty() => ChatCommand::Usage("/upload <path to image>"),
            "upload" => ChatCommand::Upload(PathBuf::from(arg)),
            "save" if arg.is_empty() => ChatCommand::Save(None),
            "save" => ChatCommand::Save(Some(PathBuf::from(arg))),
            "agent" | "assist" => ChatCommand::Agent,
            _ => ChatCommand::Unknown(format!("/{cmd}")),
        });
    }

    let command = match lower.as_str() {
        "show templates" | "list templates" => ChatCommand::ShowTemplates,
        "generate banner" | "create banner" => ChatCommand::Generate,
        "generate with defaults" => ChatCommand::GenerateWithDefaults,
        "reset" | "start over" => ChatCommand::Reset,
        "select template" => select(""),
        _ => match strip_prefix_ignore_case(trimmed, "select template ") {
            Some(ident) => select(ident),
            None => ChatCommand::FreeText(trimmed.to_string()),
        },
    };
    Some(command)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn select(arg: &str) -> ChatCommand {
    let arg = arg.trim();
    if arg.is_empty() {
        ChatCommand::Usage("select template <number, uid or name>")
    } else {
        ChatCommand::Select(arg.to_string())
    }
}

pub fn print_help() {
    let rows = [
        ("show templates", "List your templates"),
        ("select template <n|uid|name>", "Start designing from a template"),
        ("<anything else>", "Describe a change, e.g. 'make the title say Summer Sale'"),
        ("generate banner", "Render the staged changes"),
        ("generate with defaults", "Render the template as is"),
        ("reset", "Forget the template and all changes"),
        ("/upload <path>", "Upload the image a layer is waiting for, or attach one"),
        ("/cancel", "Stop waiting for an upload"),
        ("/status", "Show the template, staged changes and last render"),
        ("/save [path]", "Download the last banner (default: data dir renders/)"),
        ("/agent", "Switch between commands and the design assistant"),
        ("/clear", "Clear the screen"),
        ("/exit", "End the chat"),
    ];
    let width = rows.iter().map(|(c, _)| c.len()).max().unwrap_or(0);

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (command, description) in rows {
        println!("  {}  {}", style(format!("{command:<width$}")).cyan(), description);
    }
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
