//! The per-test simulated process and its scratch directory.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use umbra_scheduler::Scheduler;
use umbra_types::{ApiLevel, TestIdentity, VirtualThreadId};

use crate::collaborators::{Application, ResourceContexts};
use crate::configuration::{DeviceConfiguration, DisplayMetrics};
use crate::qualifiers::ResolvedQualifiers;

/// Scratch directory owned by one test.
///
/// Named `<SimpleClass>_<method>-<random>` so leftovers are attributable.
/// Deleted on drop unless [`release`](Self::release) keeps it.
#[derive(Debug)]
pub struct TempDirectory {
    dir: TempDir,
}

impl TempDirectory {
    /// Creates a directory for `test` under `root`, or under the system
    /// temp directory when `root` is `None`.
    pub fn create(test: &TestIdentity, root: Option<&Path>) -> io::Result<Self> {
        let prefix = format!("{}-", test.data_dir_name());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates (if needed) and returns a subdirectory.
    pub fn create_subdir(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Deletes the directory, or leaves it on disk and returns its path
    /// when `keep` is set.
    pub fn release(self, keep: bool) -> io::Result<Option<PathBuf>> {
        if keep {
            Ok(Some(self.dir.keep()))
        } else {
            self.dir.close()?;
            Ok(None)
        }
    }
}

/// Everything set-up built for the running test.
///
/// Owned by the universe between a successful set-up and the next
/// tear-down.
pub struct SimulatedEnvironment {
    pub(crate) test: TestIdentity,
    pub(crate) api_level: ApiLevel,
    pub(crate) qualifiers: ResolvedQualifiers,
    pub(crate) configuration: DeviceConfiguration,
    pub(crate) display_metrics: DisplayMetrics,
    pub(crate) resources: ResourceContexts,
    pub(crate) package_name: String,
    pub(crate) framework_artifact: PathBuf,
    pub(crate) main_thread: VirtualThreadId,
    pub(crate) main_scheduler: Scheduler,
    pub(crate) application: Option<Arc<dyn Application>>,
    pub(crate) temp_dir: TempDirectory,
}

impl SimulatedEnvironment {
    pub fn test(&self) -> &TestIdentity {
        &self.test
    }

    pub fn api_level(&self) -> ApiLevel {
        self.api_level
    }

    /// Canonical resolved qualifier string.
    pub fn qualifiers(&self) -> String {
        self.qualifiers.as_string()
    }

    pub fn resolved_qualifiers(&self) -> &ResolvedQualifiers {
        &self.qualifiers
    }

    pub fn configuration(&self) -> &DeviceConfiguration {
        &self.configuration
    }

    pub fn display_metrics(&self) -> &DisplayMetrics {
        &self.display_metrics
    }

    pub fn resources(&self) -> &ResourceContexts {
        &self.resources
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Local path of the framework artifact for the simulated SDK.
    pub fn framework_artifact(&self) -> &Path {
        &self.framework_artifact
    }

    pub fn main_thread(&self) -> &VirtualThreadId {
        &self.main_thread
    }

    pub fn main_scheduler(&self) -> &Scheduler {
        &self.main_scheduler
    }

    pub fn application(&self) -> Option<&Arc<dyn Application>> {
        self.application.as_ref()
    }

    pub fn temp_dir(&self) -> &TempDirectory {
        &self.temp_dir
    }
}

impl fmt::Debug for SimulatedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedEnvironment")
            .field("test", &self.test)
            .field("api_level", &self.api_level)
            .field("qualifiers", &self.qualifiers())
            .field("package_name", &self.package_name)
            .field("main_thread", &self.main_thread)
            .field(
                "application",
                &self.application.as_ref().map(|app| app.real_type()),
            )
            .field("temp_dir", &self.temp_dir.path())
            .finish_non_exhaustive()
    }
}
