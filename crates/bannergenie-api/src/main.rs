//! BannerGenie CLI entry point.
//!
//! Binary name: `bgenie`
//!
//! Parses arguments, sets up tracing, loads configuration and credentials,
//! then dispatches to a one-shot command or the interactive chat.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use bannergenie_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};

use cli::chat::ChatMode;
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(default_filter(cli.quiet, cli.verbose), cli.otel) {
        eprintln!("Warning: tracing setup failed: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need credentials.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "bgenie", &mut std::io::stdout());
        return Ok(());
    }

    // Halts here without BANNERBEAR_API_KEY.
    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Templates { refresh } => {
            cli::templates::list_templates(&state, refresh, json).await?;
        }

        Commands::Template { uid } => {
            cli::templates::show_template(&state, &uid, json).await?;
        }

        Commands::Render {
            uid,
            set,
            defaults,
            asynchronous,
            output,
            yes,
        } => {
            let args = cli::render::RenderArgs {
                uid,
                set,
                defaults,
                asynchronous,
                output,
                yes,
            };
            cli::render::render(&state, args, json).await?;
        }

        Commands::Upload { file } => {
            cli::upload::upload_file(&state, &file, json).await?;
        }

        Commands::Chat => {
            cli::chat::loop_runner::run_chat_loop(&state, ChatMode::Commands).await?;
        }

        Commands::Assist => {
            cli::chat::loop_runner::run_chat_loop(&state, ChatMode::Assistant).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
