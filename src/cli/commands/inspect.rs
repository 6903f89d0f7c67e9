//! Inspect command - show a layer's persisted metadata

use crate::cli::args::{InspectArgs, OutputFormat};
use crate::config::Config;
use crate::error::ForgeResult;
use crate::layer::LayerHandle;
use crate::ui::{self, UiContext};

/// Execute the inspect command
pub fn execute(args: InspectArgs, _config: &Config) -> ForgeResult<()> {
    let layer = LayerHandle::open(&args.layers, &args.layer)?;
    let record = layer.read_raw()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Table => print_table(&layer, &record),
    }
    Ok(())
}

fn print_table(layer: &LayerHandle, record: &toml::Table) {
    let ctx = UiContext::detect();
    ui::section(&ctx, layer.name());
    ui::key_value(&ctx, "path", &layer.path().display().to_string());

    if let Some(types) = record.get("types").and_then(|t| t.as_table()) {
        let enabled: Vec<&str> = ["launch", "build", "cache"]
            .into_iter()
            .filter(|flag| types.get(*flag).and_then(|v| v.as_bool()).unwrap_or(false))
            .collect();
        let shown = if enabled.is_empty() {
            "none".to_string()
        } else {
            enabled.join(", ")
        };
        ui::key_value(&ctx, "types", &shown);
    }

    match record.get("metadata").and_then(|m| m.as_table()) {
        Some(metadata) if !metadata.is_empty() => {
            for (key, value) in metadata {
                let shown = match value.as_str() {
                    Some(text) => text.to_string(),
                    None => value.to_string(),
                };
                ui::key_value(&ctx, key, &shown);
            }
        }
        _ => ui::remark(&ctx, "no metadata recorded"),
    }
}
