//! Configuration inspection command.

use std::path::Path;

use anyhow::{Context, Result};
use umbra_config::{ConfigLoader, Paths};

use crate::ConfigFormat;

/// Prints the effective configuration of `project_dir`.
pub fn show(project_dir: &Path, format: ConfigFormat) -> Result<()> {
    if !project_dir.is_dir() {
        anyhow::bail!("Project directory {} does not exist", project_dir.display());
    }

    let config = ConfigLoader::new()
        .with_project_dir(project_dir)
        .load()
        .context("Failed to load configuration")?;

    tracing::debug!(
        project_config = %Paths::project_config_file(project_dir).display(),
        "configuration loaded"
    );

    match format {
        ConfigFormat::Toml => print!("{}", config.to_toml_string()?),
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
