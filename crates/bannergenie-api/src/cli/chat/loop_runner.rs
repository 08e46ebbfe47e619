//! Main chat loop.
//!
//! One design session per chat. Every command's error is reported and the
//! loop carries on; an authentication failure additionally blocks anything
//! that talks to the render service until bgenie is restarted.

use std::path::{Path, PathBuf};

use console::style;
use tracing::Instrument;

use bannergenie_core::assist::{DesignAssistant, LlmDecisionMaker};
use bannergenie_core::catalog::resolve_identifier;
use bannergenie_core::nlu::LlmModificationParser;
use bannergenie_core::session::{SessionState, StageResult};
use bannergenie_core::upload::ImageHost;
use bannergenie_infra::filesystem::read_upload;
use bannergenie_infra::freeimage::FreeImageHost;
use bannergenie_observe::attrs;
use bannergenie_types::error::DesignError;
use bannergenie_types::render::{RenderJob, RenderJobState, RenderMode};
use bannergenie_types::template::TemplateSummary;

use super::ChatMode;
use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent, prompt_for};
use crate::cli::render::{download_to, render_session};
use crate::cli::templates::{layer_summary, template_table};
use crate::state::{AppState, ConcreteSession};

enum Flow {
    Continue,
    Exit,
}

struct ChatContext<'a> {
    state: &'a AppState,
    session: ConcreteSession,
    mode: ChatMode,
    parser: Result<LlmModificationParser, String>,
    assistant: Result<DesignAssistant<LlmDecisionMaker>, String>,
    host: Option<FreeImageHost>,
    /// Last catalog shown, for selection by number or name.
    listing: Vec<TemplateSummary>,
    /// Set after "generate with defaults" until the user answers.
    confirming_defaults: bool,
}

pub async fn run_chat_loop(state: &AppState, mode: ChatMode) -> anyhow::Result<()> {
    let mut ctx = ChatContext {
        state,
        session: state.new_session(RenderMode::Synchronous),
        mode: ChatMode::Commands,
        parser: state.parser(),
        assistant: state.decider().map(DesignAssistant::new),
        host: state.image_host(),
        listing: Vec::new(),
        confirming_defaults: false,
    };

    if let Err(reason) = &ctx.parser {
        tracing::warn!(%reason, "free-text parser unavailable");
    }
    let model = state.config.llm.model.as_str();
    let model_status = match mode {
        ChatMode::Commands => ctx.parser.as_ref().map(|_| model),
        ChatMode::Assistant => ctx.assistant.as_ref().map(|_| model),
    };
    print_welcome_banner(mode, model_status.map_err(String::as_str), ctx.host.is_some());
    if mode == ChatMode::Assistant {
        enter_assistant(&mut ctx).await;
    }

    let (mut input, _writer) = ChatInput::new()
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        input.set_prompt(prompt_for(
            ctx.session.template().map(|t| t.name.as_str()),
            ctx.session.pending_upload(),
        ));

        let text = match input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep designing.").dim());
                continue;
            }
            InputEvent::Line(text) => text,
        };

        if ctx.confirming_defaults {
            ctx.confirming_defaults = false;
            if is_yes(&text) {
                render(&mut ctx, true).await;
            } else {
                say("Okay, not rendering.");
            }
            continue;
        }

        let Some(command) = commands::parse(&text) else {
            continue;
        };
        if command == ChatCommand::Clear {
            input.clear();
            continue;
        }

        let span = tracing::info_span!(
            "chat_turn",
            { attrs::CHAT_COMMAND } = command_name(&command)
        );
        if let Flow::Exit = handle(&mut ctx, command).instrument(span).await {
            println!("\n  {}", style("Session ended.").dim());
            break;
        }
    }

    Ok(())
}

async fn handle(ctx: &mut ChatContext<'_>, command: ChatCommand) -> Flow {
    match command {
        ChatCommand::ShowTemplates => show_templates(ctx).await,
        ChatCommand::Select(ident) => select_template(ctx, &ident).await,
        ChatCommand::FreeText(text) => match ctx.mode {
            ChatMode::Commands => interpret(ctx, &text).await,
            ChatMode::Assistant => assist(ctx, &text).await,
        },
        ChatCommand::Generate => render(ctx, false).await,
        ChatCommand::GenerateWithDefaults => match ctx.session.template() {
            Some(template) => {
                say(&format!(
                    "Render '{}' with its default content, ignoring staged changes? (y/N)",
                    template.name
                ));
                ctx.confirming_defaults = true;
            }
            None => report(&DesignError::NoTemplateSelected),
        },
        ChatCommand::Reset => {
            ctx.session.reset();
            match ctx.mode {
                ChatMode::Commands => {
                    say("Starting over. Type 'show templates' to pick a template.")
                }
                ChatMode::Assistant => say("Starting over. What are we making?"),
            }
        }
        ChatCommand::Upload(path) => upload(ctx, &expand_home(&path)).await,
        ChatCommand::CancelUpload => match ctx.session.cancel_upload() {
            Some(layer) => say(&format!("Okay, cancelled image upload for '{layer}'.")),
            None => say("Nothing is waiting for an upload."),
        },
        ChatCommand::Status => print_status(&ctx.session),
        ChatCommand::Save(path) => save(ctx, path.as_deref()).await,
        ChatCommand::Agent => match ctx.mode {
            ChatMode::Commands => enter_assistant(ctx).await,
            ChatMode::Assistant => {
                ctx.mode = ChatMode::Commands;
                say("Back to commands. Type /help to see them.");
            }
        },
        ChatCommand::Help => commands::print_help(),
        ChatCommand::Exit => return Flow::Exit,
        ChatCommand::Usage(usage) => say(&format!("Usage: {usage}")),
        ChatCommand::Unknown(name) => {
            println!(
                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                style("?").yellow().bold(),
                style(name).dim()
            );
        }
        // Handled before dispatch; it needs the input handle.
        ChatCommand::Clear => {}
    }
    Flow::Continue
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn show_templates(ctx: &mut ChatContext<'_>) {
    let spinner = crate::cli::spinner("Fetching templates...", false);
    let result = ctx.session.list_templates().await;
    spinner.finish_and_clear();

    match result {
        Ok(templates) if templates.is_empty() => say("This API key has no templates yet."),
        Ok(templates) => {
            println!();
            println!("{}", template_table(&templates));
            say("Type 'select template <number, uid or name>' to start.");
            ctx.listing = templates;
        }
        Err(err) => report(&err),
    }
}

async fn select_template(ctx: &mut ChatContext<'_>, ident: &str) {
    // Unlisted identifiers are tried as a uid.
    let uid = resolve_identifier(&ctx.listing, ident)
        .map(|t| t.uid.clone())
        .unwrap_or_else(|| ident.to_string());

    let spinner = crate::cli::spinner("Loading template...", false);
    let result = ctx.session.select_template(&uid).await;
    spinner.finish_and_clear();

    match result {
        Ok(template) => say(&format!(
            "You've selected '{}'. {}. Tell me what to change, or type 'generate with defaults'.",
            template.name,
            layer_summary(template)
        )),
        Err(err) => report(&err),
    }
}

async fn interpret(ctx: &mut ChatContext<'_>, text: &str) {
    if ctx.session.template().is_none() {
        say("Please select a template first. Type 'show templates' to see them.");
        return;
    }
    let parser = match &ctx.parser {
        Ok(parser) => parser,
        Err(reason) => {
            say(&format!("Sorry, {reason}. Try 'generate with defaults' instead."));
            return;
        }
    };

    let spinner = crate::cli::spinner("Thinking...", false);
    let result = ctx.session.interpret(parser, text).await;
    spinner.finish_and_clear();

    match result {
        Ok(StageResult::Staged { layer_name, replaced }) => {
            let value = ctx
                .session
                .modifications()
                .get(&layer_name)
                .map(|m| m.payload.value().to_string())
                .unwrap_or_default();
            let count = ctx.session.modifications().len();
            say(&format!(
                "Okay, noted: {} '{layer_name}' to '{value}'. {count} change{} pending. \
                 Ask for more, or type 'generate banner'.",
                if replaced { "changed" } else { "change" },
                if count == 1 { "" } else { "s" }
            ));
        }
        Ok(StageResult::AwaitingUpload { layer_name }) => {
            if ctx.host.is_some() {
                say(&format!(
                    "To change the image for '{layer_name}', run /upload <path to image>, \
                     or /cancel."
                ));
            } else {
                ctx.session.cancel_upload();
                say(&format!(
                    "You want a new image for '{layer_name}', but uploads are disabled \
                     (FREEIMAGE_API_KEY is not set). You can paste an image URL instead."
                ));
            }
        }
        Err(err) => report(&err),
    }
}

/// Switch to assistant mode, loading the full catalog the first time.
async fn enter_assistant(ctx: &mut ChatContext<'_>) {
    let assistant = match ctx.assistant.as_mut() {
        Ok(assistant) => assistant,
        Err(reason) => {
            say(&format!("Sorry, {reason}. Staying in command mode."));
            return;
        }
    };

    if assistant.catalog().is_empty() {
        let spinner = crate::cli::spinner("Loading templates...", false);
        let result = assistant.load_catalog(&mut ctx.session).await;
        spinner.finish_and_clear();
        match result {
            Ok(0) => {
                say("This API key has no templates yet, so the assistant has nothing to use.");
                return;
            }
            Ok(count) => tracing::debug!(count, "assistant ready"),
            Err(err) => {
                report(&err);
                return;
            }
        }
    }

    ctx.mode = ChatMode::Assistant;
    say("Assistant mode: describe the banner you want. Type /agent to go back to commands.");
}

async fn assist(ctx: &mut ChatContext<'_>, text: &str) {
    let Ok(assistant) = ctx.assistant.as_mut() else {
        return;
    };

    let spinner = crate::cli::spinner("Thinking...", false);
    let result = assistant.respond(&mut ctx.session, text).await;
    spinner.finish_and_clear();

    let turn = match result {
        Ok(turn) => turn,
        Err(err) => {
            report(&err);
            return;
        }
    };

    say(&turn.reply);
    if turn.switched_to.is_some() {
        if let Some(template) = ctx.session.template() {
            note(&format!("Using template '{}'.", template.name));
        }
    }
    for (layer, err) in &turn.rejected {
        note(&format!("Skipped '{layer}': {err}"));
    }
    if let Some(layer) = &turn.awaiting_upload {
        if ctx.host.is_some() {
            note(&format!("Run /upload <path> to set the image for '{layer}', or /cancel."));
        } else {
            ctx.session.cancel_upload();
            note(
                "Uploads are disabled (FREEIMAGE_API_KEY is not set); \
                 paste an image URL instead.",
            );
        }
    }
    match turn.render {
        Some(Ok(job)) => announce_render(&job),
        Some(Err(err)) => report(&err),
        None => {}
    }
}

async fn render(ctx: &mut ChatContext<'_>, use_defaults: bool) {
    match render_session(&mut ctx.session, use_defaults, false).await {
        Ok(job) => announce_render(&job),
        Err(err) => report(&err),
    }
}

fn announce_render(job: &RenderJob) {
    let url = job.image_url.as_deref().unwrap_or_default();
    println!();
    println!("  {} Banner generated!", style("🎉").bold());
    println!("  {}  {}", style("URL:").bold(), style(url).cyan());
    say("Use /save [path] to download it, or keep making changes.");
}

/// Upload a local file. It fills the layer waiting for an upload, or in
/// assistant mode is attached to the next message.
async fn upload(ctx: &mut ChatContext<'_>, path: &Path) {
    let Some(host) = ctx.host.as_ref() else {
        say("Image uploads are disabled (FREEIMAGE_API_KEY is not set).");
        return;
    };
    let attach = ctx.session.pending_upload().is_none();
    if attach && ctx.mode != ChatMode::Assistant {
        report(&DesignError::NoPendingUpload);
        return;
    }
    let bytes = match read_upload(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            say(&format!("Could not read {}: {err}", path.display()));
            return;
        }
    };

    let spinner = crate::cli::spinner(&format!("Uploading {}...", path.display()), false);
    if attach {
        let result = host.upload(&bytes).await;
        spinner.finish_and_clear();
        match (result, ctx.assistant.as_mut()) {
            (Ok(url), Ok(assistant)) => {
                tracing::info!(%url, "image attached for the assistant");
                assistant.attach_image(url);
                say("Image attached. Tell me what to do with it.");
            }
            (Ok(_), Err(reason)) => say(&format!("Sorry, {reason}.")),
            (Err(err), _) => report(&err),
        }
        return;
    }

    let result = ctx.session.upload_image(host, &bytes).await;
    spinner.finish_and_clear();

    match result {
        Ok(StageResult::Staged { layer_name, .. }) => say(&format!(
            "Image uploaded and set for '{layer_name}'. {} change(s) pending.",
            ctx.session.modifications().len()
        )),
        Ok(StageResult::AwaitingUpload { .. }) => {}
        Err(err) => report(&err),
    }
}

/// Download the last finished banner to `path`, or under the data
/// directory when no path is given.
async fn save(ctx: &mut ChatContext<'_>, path: Option<&Path>) {
    let Some(job) = ctx
        .session
        .last_job()
        .filter(|job| job.state == RenderJobState::Completed)
    else {
        say("No finished banner to save yet. Type 'generate banner' first.");
        return;
    };
    let Some(url) = job.image_url.clone() else {
        say("The last render has no image URL to download.");
        return;
    };
    let path = match path {
        Some(path) => expand_home(path),
        None => ctx.state.default_render_path(job),
    };
    match download_to(&ctx.session, &url, &path, false).await {
        Ok(()) => say(&format!("Saved to {}.", path.display())),
        Err(err) => say(&format!("Could not save the banner: {err:#}")),
    }
}

fn print_status(session: &ConcreteSession) {
    println!();
    match session.template() {
        Some(template) => println!(
            "  {}  {} {}",
            style("Template:").bold(),
            style(&template.name).cyan(),
            style(format!("({})", template.uid)).dim()
        ),
        None => println!("  {}  {}", style("Template:").bold(), style("none").dim()),
    }

    if session.modifications().is_empty() {
        println!("  {}  {}", style("Changes:").bold(), style("none").dim());
    } else {
        println!("  {}", style("Changes:").bold());
        for modification in session.modifications() {
            println!(
                "    {} {} ({}) = {}",
                style("•").dim(),
                modification.layer_name,
                modification.payload.kind(),
                modification.payload.value()
            );
        }
    }

    if let Some(layer) = session.pending_upload() {
        println!(
            "  {}  {}",
            style("Waiting:").bold(),
            style(format!("upload for '{layer}'")).yellow()
        );
    }

    if let Some(job) = session.last_job() {
        let elapsed = job
            .finished_at
            .map(|done| (done - job.submitted_at).num_seconds())
            .map(|s| format!(" in {s}s"))
            .unwrap_or_default();
        println!(
            "  {}  {}{} {}",
            style("Last render:").bold(),
            job.state,
            elapsed,
            style(job.submitted_at.format("%H:%M:%S").to_string()).dim()
        );
        if let Some(url) = &job.image_url {
            println!("    {}", style(url).cyan());
        }
        if let Some(reason) = &job.failure_reason {
            println!("    {}", style(reason).red());
        }
    }

    if session.state() == SessionState::Rendering {
        println!("  {}", style("A render is in progress.").dim());
    }
    if session.is_auth_blocked() {
        println!(
            "  {}",
            style("Render service access is blocked until BANNERBEAR_API_KEY is fixed.").red()
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn say(message: &str) {
    println!();
    println!("  {} {}", style("BannerGenie >").cyan().bold(), message);
    println!();
}

fn note(message: &str) {
    println!("    {}", style(message).dim());
}

fn report(err: &DesignError) {
    let hint = match err {
        DesignError::Auth(_) => Some("Check BANNERBEAR_API_KEY and restart bgenie."),
        DesignError::NoTemplateSelected => Some("Type 'show templates' to pick one."),
        DesignError::NothingToRender => {
            Some("Describe a change first, or type 'generate with defaults'.")
        }
        DesignError::TimedOut { .. } => {
            Some("The render may still finish; try 'generate banner' again later.")
        }
        DesignError::ParseFailure(_) => Some("Could you try rephrasing?"),
        _ if err.is_retryable() => Some("You can try again."),
        _ => None,
    };
    println!();
    println!("  {} {err}", style("!").red().bold());
    if let Some(hint) = hint {
        println!("    {}", style(hint).dim());
    }
    println!();
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

fn command_name(command: &ChatCommand) -> &'static str {
    match command {
        ChatCommand::ShowTemplates => "show_templates",
        ChatCommand::Select(_) => "select",
        ChatCommand::Generate => "generate",
        ChatCommand::GenerateWithDefaults => "generate_defaults",
        ChatCommand::Reset => "reset",
        ChatCommand::Upload(_) => "upload",
        ChatCommand::CancelUpload => "cancel_upload",
        ChatCommand::Status => "status",
        ChatCommand::Save(_) => "save",
        ChatCommand::Agent => "agent",
        ChatCommand::Help => "help",
        ChatCommand::Clear => "clear",
        ChatCommand::Exit => "exit",
        ChatCommand::Usage(_) => "usage",
        ChatCommand::Unknown(_) => "unknown",
        ChatCommand::FreeText(_) => "free_text",
    }
}
