//! Seams to the world outside the harness.
//!
//! Application construction, manifest parsing, resource tables and
//! framework artifact lookup are all owned by the embedding test runner.
//! The universe only drives them, in a fixed order, through these traits.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use umbra_config::SdkSettings;
use umbra_scheduler::Scheduler;
use umbra_shadow::{InvocationError, RealObject};
use umbra_types::{ApiLevel, TestIdentity};

use crate::configuration::{DeviceConfiguration, DisplayMetrics};
use crate::error::CollaboratorError;

// ============================================================================
// SDK
// ============================================================================

/// Coordinates of the artifact that backs a simulated framework version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SdkDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl fmt::Display for SdkDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Simulated framework version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub api_level: ApiLevel,
    pub dependency: SdkDependency,
}

impl SdkConfig {
    pub fn new(api_level: ApiLevel, dependency: SdkDependency) -> Self {
        Self {
            api_level,
            dependency,
        }
    }
}

impl From<&SdkSettings> for SdkConfig {
    fn from(settings: &SdkSettings) -> Self {
        Self {
            api_level: ApiLevel::new(settings.api_level),
            dependency: SdkDependency {
                group_id: settings.group_id.clone(),
                artifact_id: settings.artifact_id.clone(),
                version: settings.version.clone(),
            },
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::from(&SdkSettings::default())
    }
}

/// Locates the framework artifact for an SDK.
pub trait DependencyResolver: Send + Sync {
    fn local_artifact_path(&self, dependency: &SdkDependency) -> Result<PathBuf, CollaboratorError>;
}

/// Resolves artifacts inside a Maven-layout repository directory
/// (`<root>/<group path>/<artifact>/<version>/<artifact>-<version>.jar`).
#[derive(Debug, Clone)]
pub struct MavenLayoutResolver {
    root: PathBuf,
    require_present: bool,
}

impl MavenLayoutResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            require_present: false,
        }
    }

    /// Fail resolution when the artifact file does not exist.
    pub fn require_present(mut self) -> Self {
        self.require_present = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DependencyResolver for MavenLayoutResolver {
    fn local_artifact_path(&self, dependency: &SdkDependency) -> Result<PathBuf, CollaboratorError> {
        let mut path = self.root.clone();
        path.extend(dependency.group_id.split('.'));
        path.push(&dependency.artifact_id);
        path.push(&dependency.version);
        path.push(format!("{}-{}.jar", dependency.artifact_id, dependency.version));

        if self.require_present && !path.is_file() {
            return Err(format!("{} not found", path.display()).into());
        }
        Ok(path)
    }
}

// ============================================================================
// Manifest and Resources
// ============================================================================

/// Failure reported by [`AppManifest::init_meta_data`].
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A resource the manifest references does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Other(CollaboratorError),
}

/// Parsed application manifest.
pub trait AppManifest: Send + Sync {
    fn package_name(&self) -> &str;

    /// Resolves manifest metadata against the application's resources.
    fn init_meta_data(&self, resources: &dyn ResourceContext) -> Result<(), ManifestError>;
}

/// Manifest with a fixed package name and no metadata to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
    package_name: String,
}

impl StaticManifest {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
        }
    }
}

impl AppManifest for StaticManifest {
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn init_meta_data(&self, _resources: &dyn ResourceContext) -> Result<(), ManifestError> {
        Ok(())
    }
}

/// A resource table the configuration is pushed into.
pub trait ResourceContext: Send + Sync {
    fn package_name(&self) -> &str;

    fn update_configuration(
        &self,
        configuration: &DeviceConfiguration,
        metrics: &DisplayMetrics,
    ) -> Result<(), CollaboratorError>;
}

/// Resource contexts handed to set-up.
#[derive(Clone)]
pub struct ResourceContexts {
    pub system: Arc<dyn ResourceContext>,
    pub application: Arc<dyn ResourceContext>,
    /// Compile-time resources, when the runner has them.
    pub compile_time: Option<Arc<dyn ResourceContext>>,
}

impl ResourceContexts {
    pub fn new(system: Arc<dyn ResourceContext>, application: Arc<dyn ResourceContext>) -> Self {
        Self {
            system,
            application,
            compile_time: None,
        }
    }

    /// System (`"android"`) and application contexts backed by
    /// [`InMemoryResources`].
    pub fn in_memory(package_name: impl Into<String>) -> Self {
        Self::new(
            Arc::new(InMemoryResources::new("android")),
            Arc::new(InMemoryResources::new(package_name)),
        )
    }

    pub fn with_compile_time(mut self, compile_time: Arc<dyn ResourceContext>) -> Self {
        self.compile_time = Some(compile_time);
        self
    }
}

impl fmt::Debug for ResourceContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceContexts")
            .field("system", &self.system.package_name())
            .field("application", &self.application.package_name())
            .field(
                "compile_time",
                &self.compile_time.as_ref().map(|c| c.package_name().to_string()),
            )
            .finish()
    }
}

/// In-memory resource context that remembers the last configuration it
/// received.
#[derive(Debug, Default)]
pub struct InMemoryResources {
    package_name: String,
    state: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    current: Option<(DeviceConfiguration, DisplayMetrics)>,
    updates: usize,
}

impl InMemoryResources {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            state: Mutex::default(),
        }
    }

    pub fn configuration(&self) -> Option<DeviceConfiguration> {
        self.lock().current.as_ref().map(|(cfg, _)| cfg.clone())
    }

    pub fn display_metrics(&self) -> Option<DisplayMetrics> {
        self.lock().current.as_ref().map(|(_, metrics)| *metrics)
    }

    /// Number of configuration pushes received.
    pub fn updates(&self) -> usize {
        self.lock().updates
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceContext for InMemoryResources {
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn update_configuration(
        &self,
        configuration: &DeviceConfiguration,
        metrics: &DisplayMetrics,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.lock();
        state.current = Some((configuration.clone(), *metrics));
        state.updates += 1;
        Ok(())
    }
}

// ============================================================================
// Application
// ============================================================================

/// Context attached to the application before `on_create`.
#[derive(Clone)]
pub struct ApplicationContext {
    pub package_name: String,
    /// Per-test data directory.
    pub data_dir: PathBuf,
    pub main_scheduler: Scheduler,
    pub configuration: DeviceConfiguration,
    pub display_metrics: DisplayMetrics,
    pub resources: Arc<dyn ResourceContext>,
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("package_name", &self.package_name)
            .field("data_dir", &self.data_dir)
            .field("main_scheduler", &self.main_scheduler)
            .field("configuration", &self.configuration)
            .field("display_metrics", &self.display_metrics)
            .finish_non_exhaustive()
    }
}

/// The application object under test.
///
/// Hooks take `&self`; implementations keep mutable state behind their
/// own locks, as real application objects are shared with framework code.
pub trait Application: RealObject {
    fn attach(&self, context: ApplicationContext) -> Result<(), InvocationError>;

    fn on_create(&self) -> Result<(), InvocationError>;

    fn on_terminate(&self) -> Result<(), InvocationError>;
}

/// Test-supplied application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Qualifiers the test asks for, e.g. `"fr-rCA-land"`.
    pub qualifiers: String,
    /// Application type the test asks for, if not the manifest's.
    pub application: Option<String>,
}

impl TestConfig {
    pub fn with_qualifiers(qualifiers: impl Into<String>) -> Self {
        Self {
            qualifiers: qualifiers.into(),
            application: None,
        }
    }
}

/// Builds the application for a test. Called once per set-up.
///
/// `Ok(None)` means the test runs without an application object.
pub trait ApplicationFactory: Send + Sync {
    fn create_application(
        &self,
        test: &TestIdentity,
        manifest: &dyn AppManifest,
        config: &TestConfig,
    ) -> Result<Option<Arc<dyn Application>>, CollaboratorError>;
}

/// Factory for tests that run without an application object.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoApplication;

impl ApplicationFactory for NoApplication {
    fn create_application(
        &self,
        _test: &TestIdentity,
        _manifest: &dyn AppManifest,
        _config: &TestConfig,
    ) -> Result<Option<Arc<dyn Application>>, CollaboratorError> {
        Ok(None)
    }
}
