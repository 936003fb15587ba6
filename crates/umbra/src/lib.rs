//! # Umbra
//!
//! Deterministic platform simulation for unit tests.
//!
//! Tests run against real framework objects whose behavior is redirected
//! to *shadows*: small simulated implementations registered per real type.
//! Each test gets a fresh simulated process (device configuration, main
//! thread scheduler on virtual time, application object, scratch
//! directory) that is torn down completely before the next test.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                             Umbra                             │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │ Registry │ → │  Binder  │   │ Scheduler │ ← │ Universe  │  │
//! │  │(resolve) │   │(dispatch)│   │ (virtual) │   │(setUp/    │  │
//! │  └──────────┘   └──────────┘   └───────────┘   │ tearDown) │  │
//! │                                                └───────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use umbra::prelude::*;
//!
//! #[derive(Default)]
//! struct ShadowToast {
//!     shown: AtomicUsize,
//! }
//!
//! let umbra = Umbra::with_defaults();
//! umbra
//!     .register(
//!         ShadowDescriptor::with_default::<ShadowToast>("android.widget.Toast")
//!             .implement("show()", |toast, _| {
//!                 toast.shown.fetch_add(1, Ordering::SeqCst);
//!                 Ok(Value::Void)
//!             })
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let mut universe = umbra.universe();
//! universe
//!     .set_up(
//!         &TestIdentity::new("com.example.ToastTest", "shows"),
//!         &StaticManifest::new("com.example"),
//!         &TestConfig::with_qualifiers("fr-rFR-land"),
//!         ResourceContexts::in_memory("com.example"),
//!     )
//!     .unwrap();
//!
//! let env = universe.environment().unwrap();
//! assert_eq!(env.configuration().orientation, Some(Orientation::Landscape));
//!
//! universe.tear_down().unwrap();
//! ```
//!
//! # Modules
//!
//! - **Entry point**: [`Umbra`] - configuration plus the shadow registry
//! - **Shadows**: [`ShadowRegistry`], [`ShadowBinder`], [`ShadowDescriptor`]
//! - **Time**: [`Scheduler`], [`LooperTable`]
//! - **Environment**: [`ParallelUniverse`], [`SimulatedEnvironment`], [`QualifierSet`]

mod error;
mod harness;

pub mod prelude;

pub use error::{Result, UmbraError};
pub use harness::Umbra;

// Re-export shared identifiers
pub use umbra_types::{ApiLevel, MethodSignature, RealType, TestIdentity, VirtualThreadId};

// Re-export the shadow layer
pub use umbra_shadow::{
    ClassHierarchy, Invocation, InvocationError, InvocationResult, ObjectRef, OverridePolicy,
    RealHandle, RealObject, ShadowBinder, ShadowBinding, ShadowDescriptor,
    ShadowDescriptorBuilder, ShadowError, ShadowRegistry, Value,
};

// Re-export virtual time
pub use umbra_scheduler::{LooperTable, Scheduler, SchedulerError, TaskId};

// Re-export configuration
pub use umbra_config::{ConfigError, ConfigLoader, UmbraConfig};

// Re-export environment orchestration
pub use umbra_env::{
    AppManifest, Application, ApplicationContext, ApplicationFactory, CollaboratorError,
    ConfigField, DependencyResolver, DeviceConfiguration, DisplayMetrics, EnvError,
    InMemoryResources, ManifestError, MavenLayoutResolver, NoApplication, ParallelUniverse,
    ParallelUniverseBuilder, Phase, QualifierDefaults, QualifierError, QualifierLayer,
    QualifierSet, ResolvedQualifiers, ResourceContext, ResourceContexts, SdkConfig,
    SdkDependency, SimulatedEnvironment, StaticManifest, TestConfig, UniverseSettings,
    resolve_qualifiers,
};

/// Qualifier value types.
pub mod qualifiers {
    pub use umbra_env::{
        Density, Keyboard, KeysHidden, LayoutDirection, Locale, NavHidden, Navigation, NightMode,
        Orientation, ScreenLong, ScreenRound, ScreenSize, Touchscreen, UiModeType,
    };
}

pub use umbra_env::logging;
