//! `bgenie upload <file>`: publish a local image through the image host.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use bannergenie_core::upload::ImageHost;
use bannergenie_infra::filesystem::read_upload;

use crate::state::AppState;

pub async fn upload_file(state: &AppState, path: &Path, json: bool) -> Result<()> {
    let host = state.require_image_host()?;
    let bytes = read_upload(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;

    let spinner = super::spinner(&format!("Uploading {}...", path.display()), json);
    let url = host.upload(&bytes).await;
    spinner.finish_and_clear();
    let url = url?;

    if json {
        let out = serde_json::json!({
            "file": path.display().to_string(),
            "size": bytes.len(),
            "url": url,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {} Uploaded {}", style("✓").green().bold(), path.display());
    println!("  {}  {}", style("URL:").bold(), style(&url).cyan());
    println!();
    Ok(())
}
