//! One-shot rendering: `bgenie render <uid> --set layer=value ...`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Confirm;
use tracing::Instrument;

use bannergenie_core::render::client::RenderClient;
use bannergenie_infra::filesystem::{read_upload, save_image};
use bannergenie_observe::attrs;
use bannergenie_types::error::DesignError;
use bannergenie_types::modification::PENDING_UPLOAD;
use bannergenie_types::render::{RenderJob, RenderMode};
use bannergenie_types::template::LayerKind;

use super::progress::RenderSpinner;
use crate::state::{AppState, ConcreteSession};

/// A parsed `--set` argument.
#[derive(Debug, PartialEq, Eq)]
pub enum Assignment {
    Value { layer: String, value: String },
    /// `layer=@path`: upload the file and use its URL.
    Upload { layer: String, path: PathBuf },
}

/// Parse `layer=value`. Only the first `=` splits, so values may contain `=`.
pub fn parse_assignment(raw: &str) -> Result<Assignment> {
    let Some((layer, value)) = raw.split_once('=') else {
        bail!("expected LAYER=VALUE, got '{raw}'");
    };
    let layer = layer.trim();
    if layer.is_empty() {
        bail!("missing layer name in '{raw}'");
    }
    let value = value.trim();
    match value.strip_prefix('@') {
        Some(path) if !path.is_empty() => Ok(Assignment::Upload {
            layer: layer.to_string(),
            path: PathBuf::from(path),
        }),
        _ => Ok(Assignment::Value {
            layer: layer.to_string(),
            value: value.to_string(),
        }),
    }
}

pub struct RenderArgs {
    pub uid: String,
    pub set: Vec<String>,
    pub defaults: bool,
    pub asynchronous: bool,
    pub output: Option<PathBuf>,
    pub yes: bool,
}

pub async fn render(state: &AppState, args: RenderArgs, json: bool) -> Result<()> {
    let assignments = args
        .set
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;
    if assignments.is_empty() && !args.defaults {
        bail!(
            "no changes given; pass --set LAYER=VALUE or --defaults to render the template as is"
        );
    }

    let mode = if args.asynchronous {
        RenderMode::Asynchronous
    } else {
        RenderMode::Synchronous
    };
    let mut session = state.new_session(mode);

    let spinner = super::spinner("Loading template...", json);
    let selected = session.select_template(&args.uid).await.map(|_| ());
    spinner.finish_and_clear();
    selected?;

    for assignment in assignments {
        stage(state, &mut session, assignment, json).await?;
    }

    let use_defaults = session.modifications().is_empty();
    if use_defaults && !args.yes && !json {
        let name = session.template().map(|t| t.name.clone()).unwrap_or_default();
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Render '{}' with its default content?",
                style(&name).cyan()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Aborted.");
            return Ok(());
        }
    }
    let job = render_session(&mut session, use_defaults, json).await?;

    let saved = match (&args.output, &job.image_url) {
        (Some(path), Some(url)) => {
            download_to(&session, url, path, json).await?;
            Some(path.clone())
        }
        _ => None,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }
    print_job(&job, saved.as_deref());
    Ok(())
}

/// Render the session's staged changes (or the template defaults) behind a
/// progress spinner, recording the outcome on the current span.
pub async fn render_session(
    session: &mut ConcreteSession,
    use_defaults: bool,
    hidden: bool,
) -> Result<RenderJob, DesignError> {
    let modification_count = if use_defaults {
        0
    } else {
        session.modifications().len()
    };
    let span = tracing::info_span!(
        "render_banner",
        { attrs::TEMPLATE_UID } = session.template().map(|t| t.uid.as_str()).unwrap_or(""),
        { attrs::MODIFICATION_COUNT } = modification_count,
        { attrs::JOB_ID } = tracing::field::Empty,
        { attrs::JOB_STATE } = tracing::field::Empty,
        { attrs::POLL_ATTEMPTS } = tracing::field::Empty,
    );

    let progress = RenderSpinner::start(session.subscribe(), hidden);
    let result = async {
        if use_defaults {
            session.request_render_with_defaults().await
        } else {
            session.request_render().await
        }
    }
    .instrument(span.clone())
    .await;
    progress.finish().await;

    if let Some(job) = session.last_job() {
        span.record(attrs::JOB_ID, tracing::field::display(job.id));
        span.record(attrs::JOB_STATE, tracing::field::display(job.state));
        span.record(attrs::POLL_ATTEMPTS, job.poll_attempts);
    }
    result
}

async fn stage(
    state: &AppState,
    session: &mut ConcreteSession,
    assignment: Assignment,
    json: bool,
) -> Result<()> {
    match assignment {
        Assignment::Value { layer, value } => {
            // Unknown layers fall through to the session's own error.
            let kind = session.layer_kind(&layer).unwrap_or(LayerKind::Text);
            session.stage_modification(&layer, kind, &value)?;
        }
        Assignment::Upload { layer, path } => {
            let host = state.require_image_host()?;
            let bytes = read_upload(&path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?;
            session.stage_modification(&layer, LayerKind::Image, PENDING_UPLOAD)?;
            let spinner = super::spinner(&format!("Uploading {}...", path.display()), json);
            let uploaded = session.upload_image(&host, &bytes).await;
            spinner.finish_and_clear();
            uploaded?;
        }
    }
    Ok(())
}

pub async fn download_to(
    session: &ConcreteSession,
    url: &str,
    path: &Path,
    quiet: bool,
) -> Result<()> {
    let spinner = super::spinner("Downloading image...", quiet);
    let bytes = session.client().download_image(url).await;
    spinner.finish_and_clear();
    let bytes = bytes?;
    save_image(path, &bytes)
        .await
        .with_context(|| format!("could not write {}", path.display()))?;
    tracing::info!(path = %path.display(), size = bytes.len(), "image saved");
    Ok(())
}

fn print_job(job: &RenderJob, saved: Option<&Path>) {
    println!();
    println!("  {} Banner ready!", style("✓").green().bold());
    println!();
    if let Some(url) = &job.image_url {
        println!("  {}  {}", style("URL:").bold(), style(url).cyan());
    }
    if let Some(path) = saved {
        println!("  {}  {}", style("Saved:").bold(), path.display());
    }
    println!(
        "  {}  {}",
        style("Changes:").bold(),
        if job.uses_template_defaults() {
            "template defaults".to_string()
        } else {
            job.modifications().len().to_string()
        }
    );
    if job.poll_attempts > 0 {
        println!(
            "  {}  {}",
            style("Checks:").bold(),
            style(job.poll_attempts).dim()
        );
    }
    println!();
}
