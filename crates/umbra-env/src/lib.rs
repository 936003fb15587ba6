//! # umbra-env: Per-test simulated environments for `Umbra`
//!
//! Every test runs inside a fresh simulated process: a device
//! configuration derived from resource qualifiers, a main-thread scheduler
//! on virtual time, an application object with its shadow bound, and a
//! scratch directory. [`ParallelUniverse`] builds that process in
//! [`set_up`](ParallelUniverse::set_up) and destroys it in
//! [`tear_down`](ParallelUniverse::tear_down), so nothing one test does
//! is visible to the next.
//!
//! ## Key Concepts
//!
//! - **[`QualifierSet`]**: Parsed, ordered resource qualifiers (`en-rUS-land-hdpi`)
//! - **[`resolve_qualifiers`]**: Explicit qualifiers layered over version and screen defaults
//! - **[`DeviceConfiguration`]**: Structured configuration with per-field API-level gating
//! - **[`SimulatedEnvironment`]**: Everything a live test can observe
//! - **[`ParallelUniverse`]**: The `TornDown -> Configuring -> Live` state machine
//!
//! Application construction, manifests, resource tables and artifact
//! lookup belong to the embedding runner and are reached through the
//! traits [`ApplicationFactory`], [`AppManifest`], [`ResourceContext`] and
//! [`DependencyResolver`].

mod collaborators;
mod configuration;
mod environment;
mod error;
pub mod logging;
mod qualifiers;
mod universe;

pub use collaborators::{
    AppManifest, Application, ApplicationContext, ApplicationFactory, DependencyResolver,
    InMemoryResources, ManifestError, MavenLayoutResolver, NoApplication, ResourceContext,
    ResourceContexts, SdkConfig, SdkDependency, StaticManifest, TestConfig,
};
pub use configuration::{ConfigField, DeviceConfiguration, DisplayMetrics};
pub use environment::{SimulatedEnvironment, TempDirectory};
pub use error::{CollaboratorError, EnvError, QualifierError};
pub use qualifiers::{
    Density, Keyboard, KeysHidden, LayoutDirection, Locale, NavHidden, Navigation, NightMode,
    Orientation, QualifierDefaults, QualifierLayer, QualifierSet, ResolvedQualifiers, ScreenLong,
    ScreenRound, ScreenSize, Touchscreen, UiModeType, resolve_qualifiers,
};
pub use universe::{ParallelUniverse, ParallelUniverseBuilder, Phase, UniverseSettings};
