//! Configuration management for Umbra
//!
//! Harness settings are loaded hierarchically (highest precedence first):
//! 1. Environment variables (`UMBRA_<SECTION>__<KEY>`)
//! 2. umbra.local.toml (gitignored, local overrides)
//! 3. umbra.toml (git-tracked, project config)
//! 4. ~/.config/umbra/config.toml (user defaults)
//! 5. Built-in defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Umbra configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmbraConfig {
    pub sdk: SdkSettings,
    pub device: DeviceSettings,
    pub scheduler: SchedulerSettings,
    pub filesystem: FilesystemSettings,
    pub logging: LoggingSettings,
}

/// Simulated framework version and the artifact that backs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkSettings {
    pub api_level: u16,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Default for SdkSettings {
    fn default() -> Self {
        Self {
            api_level: 19,
            group_id: "org.umbra.framework".to_string(),
            artifact_id: "android-all".to_string(),
            version: "4.4_r1".to_string(),
        }
    }
}

/// Screen defaults filled in when a test's qualifiers leave them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub smallest_screen_width_dp: u32,
    pub screen_width_dp: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            smallest_screen_width_dp: 320,
            screen_width_dp: 320,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Pause the main scheduler as soon as it is prepared.
    pub start_paused: bool,
    /// Virtual thread designated as main.
    pub main_thread: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            start_paused: false,
            main_thread: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemSettings {
    /// Parent of per-test temp directories. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,
    /// Leave per-test directories on disk after teardown.
    pub keep_temp_dirs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl UmbraConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML file, without merging other sources.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the harness cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sdk.api_level == 0 {
            return Err(ConfigError::ValidationError(
                "sdk.api_level must be at least 1".to_string(),
            ));
        }
        if self.device.smallest_screen_width_dp == 0 {
            return Err(ConfigError::ValidationError(
                "device.smallest_screen_width_dp must be non-zero".to_string(),
            ));
        }
        if self.device.screen_width_dp == 0 {
            return Err(ConfigError::ValidationError(
                "device.screen_width_dp must be non-zero".to_string(),
            ));
        }
        if self.scheduler.main_thread.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "scheduler.main_thread must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if let Some(root) = &self.filesystem.temp_root
            && root.is_relative()
        {
            self.filesystem.temp_root = Some(base.join(root));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UmbraConfig::default();
        assert_eq!(config.sdk.api_level, 19);
        assert_eq!(config.device.smallest_screen_width_dp, 320);
        assert_eq!(config.device.screen_width_dp, 320);
        assert!(!config.scheduler.start_paused);
        assert_eq!(config.scheduler.main_thread, "main");
        assert_eq!(config.logging.filter, "info");
        assert!(config.filesystem.temp_root.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_widths() {
        let mut config = UmbraConfig::default();
        config.device.screen_width_dp = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("screen_width_dp")
        ));

        let mut config = UmbraConfig::default();
        config.sdk.api_level = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_resolution() {
        let mut config = UmbraConfig::default();
        config.filesystem.temp_root = Some(PathBuf::from("build/tmp"));
        config.resolve_paths("/home/user/project");

        assert_eq!(
            config.filesystem.temp_root,
            Some(PathBuf::from("/home/user/project/build/tmp"))
        );
    }

    #[test]
    fn test_toml_rendering_parses_back() {
        let mut config = UmbraConfig::default();
        config.sdk.api_level = 23;
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[sdk]"));
        assert!(!rendered.contains("temp_root"));

        let parsed: UmbraConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[sdk\napi_level = ").unwrap();

        let err = UmbraConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));

        let missing = UmbraConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::ReadError { .. }));
    }
}
