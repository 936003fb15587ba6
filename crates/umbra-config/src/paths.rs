//! Where Umbra looks for configuration and keeps downloaded artifacts.
//!
//! | What | Location |
//! |------|----------|
//! | User defaults | `<config dir>/umbra/config.toml` |
//! | Project config | `<project>/umbra.toml` |
//! | Local overrides | `<project>/umbra.local.toml` |
//! | Framework artifacts | `<cache dir>/umbra/artifacts/` |

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::ConfigError;

const PROJECT_CONFIG: &str = "umbra.toml";
const LOCAL_CONFIG: &str = "umbra.local.toml";
const USER_CONFIG: &str = "config.toml";
const ARTIFACTS: &str = "artifacts";

/// Per-user directories, discovered once.
pub struct Paths {
    dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            dirs: ProjectDirs::from("org", "Umbra", "umbra"),
        }
    }

    fn dirs(&self, what: &'static str) -> Result<&ProjectDirs, ConfigError> {
        self.dirs
            .as_ref()
            .ok_or(ConfigError::NoUserDirectory(what))
    }

    /// User-wide defaults, applied beneath every project's config.
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.dirs("config")?.config_dir().join(USER_CONFIG))
    }

    /// Local Maven-layout repository the default artifact resolver reads
    /// framework jars from.
    pub fn artifact_cache_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.dirs("cache")?.cache_dir().join(ARTIFACTS))
    }

    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(PROJECT_CONFIG)
    }

    /// Uncommitted per-checkout overrides.
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(LOCAL_CONFIG)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
