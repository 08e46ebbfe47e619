//! CLI command definitions for the `bgenie` binary.

pub mod chat;
pub mod progress;
pub mod render;
pub mod templates;
pub mod upload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Design Bannerbear banners from the terminal.
#[derive(Parser)]
#[command(name = "bgenie", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through the OpenTelemetry stdout exporter.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List templates visible to your API key.
    #[command(alias = "ls")]
    Templates {
        /// Bypass the cached listing.
        #[arg(long)]
        refresh: bool,
    },

    /// Show a template's editable layers.
    Template {
        /// Template uid.
        uid: String,
    },

    /// Render a banner in one shot.
    Render {
        /// Template uid.
        uid: String,

        /// Layer change as `layer=value`; repeatable. `layer=@path` uploads a
        /// local image for an image layer.
        #[arg(long = "set", value_name = "LAYER=VALUE")]
        set: Vec<String>,

        /// Render with the template's defaults when no `--set` is given.
        #[arg(long)]
        defaults: bool,

        /// Submit asynchronously and poll for completion.
        #[arg(long = "async")]
        asynchronous: bool,

        /// Save the finished image to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the confirmation for rendering template defaults.
        #[arg(short, long)]
        yes: bool,
    },

    /// Upload a local image and print its public URL.
    Upload {
        file: PathBuf,
    },

    /// Start the interactive design chat.
    Chat,

    /// Start the chat with the design assistant choosing templates and
    /// layers from plain descriptions.
    Assist,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// A steady-ticking cyan spinner, hidden when output must stay clean.
pub fn spinner(message: &str, hidden: bool) -> indicatif::ProgressBar {
    if hidden {
        return indicatif::ProgressBar::hidden();
    }
    let spinner = indicatif::ProgressBar::new_spinner();
    if let Ok(style) =
        indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
