//! Top-level entry point: configuration plus the shadow registry, from
//! which per-test universes are built.

use std::path::Path;
use std::sync::Arc;

use umbra_config::{ConfigLoader, UmbraConfig};
use umbra_env::{ParallelUniverse, ParallelUniverseBuilder, UniverseSettings};
use umbra_shadow::{ShadowDescriptor, ShadowRegistry};
use umbra_types::RealType;

use crate::error::Result;

/// Harness configuration and the process-wide shadow registry.
///
/// The registry is populated once, before the first universe is built;
/// every universe built from the same `Umbra` shares it.
#[derive(Debug, Clone)]
pub struct Umbra {
    config: UmbraConfig,
    registry: Arc<ShadowRegistry>,
}

impl Umbra {
    pub fn new(config: UmbraConfig, registry: ShadowRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Built-in configuration and an empty registry.
    pub fn with_defaults() -> Self {
        Self::new(UmbraConfig::default(), ShadowRegistry::default())
    }

    /// Loads the layered configuration of `project_dir` (user file,
    /// `umbra.toml`, `umbra.local.toml`, `UMBRA_*` variables).
    pub fn load(project_dir: impl AsRef<Path>, registry: ShadowRegistry) -> Result<Self> {
        let config = ConfigLoader::new().with_project_dir(project_dir).load()?;
        tracing::debug!(api_level = config.sdk.api_level, "harness configuration loaded");
        Ok(Self::new(config, registry))
    }

    /// Registers a shadow. Registration should finish before tests run.
    pub fn register(&self, descriptor: ShadowDescriptor) -> Result<&Self> {
        self.registry.register(descriptor)?;
        Ok(self)
    }

    /// Declares `parent` as the direct supertype of `real_type`.
    pub fn declare_type(
        &self,
        real_type: impl Into<RealType>,
        parent: impl Into<RealType>,
    ) -> Result<&Self> {
        self.registry.declare_type(real_type, parent)?;
        Ok(self)
    }

    pub fn config(&self) -> &UmbraConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ShadowRegistry> {
        &self.registry
    }

    /// Universe builder preconfigured from the harness configuration.
    pub fn universe_builder(&self) -> ParallelUniverseBuilder {
        ParallelUniverse::builder(Arc::clone(&self.registry))
            .settings(UniverseSettings::from(&self.config))
    }

    /// Universe with the default collaborators.
    pub fn universe(&self) -> ParallelUniverse {
        self.universe_builder().build()
    }
}
