//! Qualifier resolution command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use umbra::{
    ApiLevel, ConfigField, ConfigLoader, DeviceConfiguration, DisplayMetrics, QualifierDefaults,
    resolve_qualifiers,
};

use crate::Format;

#[derive(Serialize)]
struct Resolution<'a> {
    api_level: ApiLevel,
    qualifiers: String,
    filled_by: Vec<&'static str>,
    gated_out: &'a [ConfigField],
    configuration: &'a DeviceConfiguration,
    display_metrics: &'a DisplayMetrics,
}

/// Resolves `qualifiers` with the project's defaults and prints the
/// resulting configuration.
pub fn run(qualifiers: &str, api_level: Option<u16>, project_dir: &Path, format: Format) -> Result<()> {
    let config = ConfigLoader::new()
        .with_project_dir(project_dir)
        .load()
        .context("Failed to load configuration")?;

    let api_level = ApiLevel::new(api_level.unwrap_or(config.sdk.api_level));
    let defaults = QualifierDefaults {
        api_level,
        smallest_screen_width_dp: config.device.smallest_screen_width_dp,
        screen_width_dp: config.device.screen_width_dp,
    };

    let resolved = resolve_qualifiers(qualifiers, &defaults)
        .with_context(|| format!("Failed to resolve qualifiers '{qualifiers}'"))?;
    let configuration = DeviceConfiguration::from_qualifiers(&resolved.qualifiers, api_level);
    let display_metrics = DisplayMetrics::for_configuration(&configuration);

    let resolution = Resolution {
        api_level,
        qualifiers: resolved.as_string(),
        filled_by: resolved.filled_by.iter().map(|layer| layer.name()).collect(),
        gated_out: &configuration.gated_out,
        configuration: &configuration,
        display_metrics: &display_metrics,
    };

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Format::Text => {
            println!("Resolved:  {}", resolution.qualifiers);
            println!("API level: {api_level}");
            if !resolution.filled_by.is_empty() {
                println!("Defaults:  {}", resolution.filled_by.join(", "));
            }
            if !configuration.gated_out.is_empty() {
                let gated: Vec<&str> = configuration.gated_out.iter().map(|f| f.name()).collect();
                println!("Gated out: {}", gated.join(", "));
            }
            println!(
                "Metrics:   {}x{} px at {} dpi",
                display_metrics.width_pixels, display_metrics.height_pixels, display_metrics.density_dpi
            );
            println!();
            println!("{}", serde_json::to_string_pretty(&configuration)?);
        }
    }
    Ok(())
}
