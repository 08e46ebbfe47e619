//! Template catalog commands: `bgenie templates` and `bgenie template <uid>`.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use bannergenie_core::render::client::RenderClient;
use bannergenie_types::template::{LayerKind, Template, TemplateSummary};

use crate::state::AppState;

pub async fn list_templates(state: &AppState, refresh: bool, json: bool) -> Result<()> {
    let client = state.render_client();
    let spinner = super::spinner("Fetching templates...", json);
    let templates = if refresh {
        client.refresh_templates().await
    } else {
        client.list_templates().await
    };
    spinner.finish_and_clear();
    let templates = templates?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!();
        println!("  No templates found for this API key.");
        println!();
        return Ok(());
    }

    println!();
    println!("{}", template_table(&templates));
    println!();
    println!(
        "  {}",
        style("Use `bgenie template <uid>` to see a template's layers.").dim()
    );
    println!();
    Ok(())
}

pub async fn show_template(state: &AppState, uid: &str, json: bool) -> Result<()> {
    let client = state.render_client();
    let spinner = super::spinner("Fetching template...", json);
    let template = client.fetch_template_details(uid).await;
    spinner.finish_and_clear();
    let template = template?;

    if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(&template.name).cyan().bold(),
        style(format!("({})", template.uid)).dim()
    );
    println!();
    if template.layers.is_empty() {
        println!("  This template has no editable layers.");
    } else {
        println!("{}", layer_table(&template));
    }
    println!();
    Ok(())
}

/// Numbered catalog table; the numbers are what `select template <n>` takes.
pub fn template_table(templates: &[TemplateSummary]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("UID").fg(Color::White),
    ]);
    for (i, template) in templates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&template.name).fg(Color::Cyan),
            Cell::new(&template.uid),
        ]);
    }
    table
}

pub fn layer_table(template: &Template) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Layer").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
    ]);
    for layer in &template.layers {
        table.add_row(vec![
            Cell::new(&layer.name),
            Cell::new(layer.kind).fg(kind_color(layer.kind)),
        ]);
    }
    table
}

fn kind_color(kind: LayerKind) -> Color {
    match kind {
        LayerKind::Text => Color::Green,
        LayerKind::Image => Color::Magenta,
        LayerKind::Color => Color::Yellow,
    }
}

/// One-line description of a template's layers, e.g.
/// "3 editable layers: title (text), photo (image), bg (color)".
pub fn layer_summary(template: &Template) -> String {
    if template.layers.is_empty() {
        return "It has no editable layers, but you can still render it with its defaults."
            .to_string();
    }
    let layers = template
        .layers
        .iter()
        .map(|l| format!("{} ({})", l.name, l.kind))
        .collect::<Vec<_>>()
        .join(", ");
    let n = template.layers.len();
    format!(
        "{n} editable layer{}: {layers}",
        if n == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bannergenie_types::template::LayerDescriptor;

    fn template(layers: Vec<LayerDescriptor>) -> Template {
        Template {
            uid: "tpl_1".to_string(),
            name: "Summer Sale".to_string(),
            layers,
        }
    }

    #[test]
    fn layer_summary_lists_kinds() {
        let t = template(vec![
            LayerDescriptor::new("title", LayerKind::Text),
            LayerDescriptor::new("photo", LayerKind::Image),
        ]);
        assert_eq!(
            layer_summary(&t),
            "2 editable layers: title (text), photo (image)"
        );
    }

    #[test]
    fn layer_summary_singular_and_empty() {
        let one = template(vec![LayerDescriptor::new("bg", LayerKind::Color)]);
        assert_eq!(layer_summary(&one), "1 editable layer: bg (color)");
        assert!(layer_summary(&template(Vec::new())).contains("no editable layers"));
    }

    #[test]
    fn template_table_numbers_rows_from_one() {
        let rendered = template_table(&[
            TemplateSummary {
                uid: "a".to_string(),
                name: "Alpha".to_string(),
            },
            TemplateSummary {
                uid: "b".to_string(),
                name: "Beta".to_string(),
            },
        ])
        .to_string();
        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("Beta"));
        assert!(rendered.contains(" 2 "));
    }
}
