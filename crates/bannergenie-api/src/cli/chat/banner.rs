//! Welcome banner for chat sessions.

use console::style;

use super::ChatMode;

/// Print the greeting plus which optional features are available.
pub fn print_welcome_banner(
    mode: ChatMode,
    model_status: Result<&str, &str>,
    uploads_enabled: bool,
) {
    let greeting = match mode {
        ChatMode::Commands => "Hi! Type 'show templates' to start.",
        ChatMode::Assistant => "Hi! Describe the banner you want and I'll pick a template.",
    };
    println!();
    println!("  {} {}", "🎨", style("BannerGenie").cyan().bold());
    println!("  {}", style(greeting).dim());
    println!();
    match model_status {
        Ok(model) => println!("  {}  {}", style("Model:").bold(), style(model).dim()),
        Err(reason) => println!("  {}  {}", style("Model:").bold(), style(reason).yellow()),
    }
    println!(
        "  {}  {}",
        style("Uploads:").bold(),
        if uploads_enabled {
            style("enabled").dim()
        } else {
            style("disabled (FREEIMAGE_API_KEY is not set)").yellow()
        }
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}
