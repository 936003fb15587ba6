//! The per-test environment orchestrator.
//!
//! A [`ParallelUniverse`] moves through `TornDown -> Configuring -> Live ->
//! TornDown` once per test. Set-up runs a fixed sequence:
//!
//! 1. Reset everything a previous test may have left behind (bindings, the
//!    looper table and its schedulers, the environment), even if that
//!    test's tear-down never ran.
//! 2. Resolve the framework artifact, create the test's temp directory and
//!    initialize the manifest against the application resources.
//! 3. Layer the qualifiers: explicit, platform version, default smallest
//!    width, default width.
//! 4. Build the device configuration, gating each field on the API level.
//! 5. Prepare the main looper on the main virtual thread.
//! 6. Push the configuration to the system resources, create the
//!    application, bind its shadow, attach its context, push the
//!    configuration to the application resources and call `on_create`.
//!
//! The application's lifecycle hooks (`attach(Context)`, `onCreate()`,
//! `onTerminate()`) go through its shadow binding like any other call: a
//! shadow that overrides one of them runs instead of the [`Application`]
//! method. An overridden `attach(Context)` receives the package name as
//! its only argument.
//!
//! Any failure resets all state and leaves the universe torn down; the
//! caller only ever sees a fully live environment or none at all.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use umbra_config::{Paths, UmbraConfig};
use umbra_scheduler::{LooperTable, Scheduler};
use umbra_shadow::{
    InvocationError, ObjectRef, OverridePolicy, ShadowBinder, ShadowError, ShadowRegistry, Value,
};
use umbra_types::{ApiLevel, MethodSignature, TestIdentity, VirtualThreadId};

use crate::collaborators::{
    AppManifest, Application, ApplicationContext, ApplicationFactory, DependencyResolver,
    ManifestError, MavenLayoutResolver, NoApplication, ResourceContexts, SdkConfig, TestConfig,
};
use crate::configuration::{DeviceConfiguration, DisplayMetrics};
use crate::environment::{SimulatedEnvironment, TempDirectory};
use crate::error::EnvError;
use crate::logging;
use crate::qualifiers::{QualifierDefaults, resolve_qualifiers};

const ATTACH: &str = "attach(Context)";
const ON_CREATE: &str = "onCreate()";
const ON_TERMINATE: &str = "onTerminate()";

/// Lifecycle phase of a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    TornDown,
    Configuring,
    Live,
}

/// Settings a universe is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseSettings {
    pub sdk: SdkConfig,
    pub smallest_screen_width_dp: u32,
    pub screen_width_dp: u32,
    pub main_thread: VirtualThreadId,
    /// Pause the main scheduler right after it is prepared.
    pub start_paused: bool,
    pub temp_root: Option<PathBuf>,
    pub keep_temp_dirs: bool,
    pub log_filter: String,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self::from(&UmbraConfig::default())
    }
}

impl From<&UmbraConfig> for UniverseSettings {
    fn from(config: &UmbraConfig) -> Self {
        Self {
            sdk: SdkConfig::from(&config.sdk),
            smallest_screen_width_dp: config.device.smallest_screen_width_dp,
            screen_width_dp: config.device.screen_width_dp,
            main_thread: VirtualThreadId::new(&config.scheduler.main_thread),
            start_paused: config.scheduler.start_paused,
            temp_root: config.filesystem.temp_root.clone(),
            keep_temp_dirs: config.filesystem.keep_temp_dirs,
            log_filter: config.logging.filter.clone(),
        }
    }
}

/// Builder for [`ParallelUniverse`].
pub struct ParallelUniverseBuilder {
    registry: Arc<ShadowRegistry>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    factory: Arc<dyn ApplicationFactory>,
    loopers: LooperTable,
    settings: UniverseSettings,
}

impl ParallelUniverseBuilder {
    /// Artifact resolver. Defaults to a Maven layout rooted at
    /// [`Paths::artifact_cache_dir`] (the system temp directory if there is
    /// no user cache directory) that does not check for the file.
    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Application factory. Defaults to [`NoApplication`].
    pub fn factory(mut self, factory: Arc<dyn ApplicationFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Looper table to drive. Sharing one lets other code observe the main
    /// thread designation.
    pub fn loopers(mut self, loopers: LooperTable) -> Self {
        self.loopers = loopers;
        self
    }

    pub fn settings(mut self, settings: UniverseSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shorthand for `settings(UniverseSettings::from(config))`.
    pub fn config(self, config: &UmbraConfig) -> Self {
        self.settings(UniverseSettings::from(config))
    }

    pub fn sdk(mut self, sdk: SdkConfig) -> Self {
        self.settings.sdk = sdk;
        self
    }

    pub fn build(self) -> ParallelUniverse {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(MavenLayoutResolver::new(default_artifact_root())));
        ParallelUniverse {
            binder: Arc::new(ShadowBinder::new(Arc::clone(&self.registry))),
            registry: self.registry,
            loopers: self.loopers,
            resolver,
            factory: self.factory,
            settings: self.settings,
            phase: Phase::TornDown,
            environment: None,
        }
    }
}

fn default_artifact_root() -> PathBuf {
    Paths::new().artifact_cache_dir().unwrap_or_else(|err| {
        let fallback = std::env::temp_dir().join("umbra-artifacts");
        tracing::debug!(error = %err, fallback = %fallback.display(), "using temp artifact root");
        fallback
    })
}

/// Orchestrates one simulated process per test.
pub struct ParallelUniverse {
    registry: Arc<ShadowRegistry>,
    binder: Arc<ShadowBinder>,
    loopers: LooperTable,
    resolver: Arc<dyn DependencyResolver>,
    factory: Arc<dyn ApplicationFactory>,
    settings: UniverseSettings,
    phase: Phase,
    environment: Option<SimulatedEnvironment>,
}

impl ParallelUniverse {
    pub fn builder(registry: Arc<ShadowRegistry>) -> ParallelUniverseBuilder {
        ParallelUniverseBuilder {
            registry,
            resolver: None,
            factory: Arc::new(NoApplication),
            loopers: LooperTable::new(),
            settings: UniverseSettings::default(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Builds a live environment for `test`.
    ///
    /// # Errors
    ///
    /// [`EnvError::ReentrantSetUp`] if an environment is already live (it
    /// is left untouched). Any other error means set-up failed part way;
    /// all state has been reset and the universe is torn down.
    pub fn set_up(
        &mut self,
        test: &TestIdentity,
        manifest: &dyn AppManifest,
        config: &TestConfig,
        resources: ResourceContexts,
    ) -> Result<(), EnvError> {
        if self.phase == Phase::Live
            && let Some(live) = &self.environment
        {
            return Err(EnvError::ReentrantSetUp {
                live: live.test.clone(),
            });
        }

        logging::init_test_logging(&self.settings.log_filter);
        self.reset_state();
        self.phase = Phase::Configuring;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.configure(test, manifest, config, resources)
        }));

        match outcome {
            Ok(Ok(environment)) => {
                tracing::info!(
                    test = %test,
                    qualifiers = %environment.qualifiers(),
                    api_level = %environment.api_level,
                    "environment live"
                );
                self.environment = Some(environment);
                self.phase = Phase::Live;
                Ok(())
            }
            Ok(Err(err)) => {
                tracing::warn!(test = %test, error = %err, "set-up failed; environment reset");
                self.reset_state();
                self.phase = Phase::TornDown;
                Err(err)
            }
            Err(payload) => {
                self.reset_state();
                self.phase = Phase::TornDown;
                panic::resume_unwind(payload)
            }
        }
    }

    fn configure(
        &self,
        test: &TestIdentity,
        manifest: &dyn AppManifest,
        config: &TestConfig,
        resources: ResourceContexts,
    ) -> Result<SimulatedEnvironment, EnvError> {
        let settings = &self.settings;
        let api_level = settings.sdk.api_level;

        let framework_artifact = self
            .resolver
            .local_artifact_path(&settings.sdk.dependency)
            .map_err(|source| EnvError::ArtifactResolution {
                dependency: settings.sdk.dependency.clone(),
                source,
            })?;

        let temp_dir = TempDirectory::create(test, settings.temp_root.as_deref()).map_err(
            |source| EnvError::TempDirectory {
                test: test.clone(),
                root: settings.temp_root.clone(),
                source,
            },
        )?;

        let package_name = manifest.package_name().to_string();
        manifest
            .init_meta_data(resources.application.as_ref())
            .map_err(|err| match err {
                ManifestError::NotFound(message) => EnvError::ResourceNotFound {
                    package: package_name.clone(),
                    message,
                },
                ManifestError::Other(source) => EnvError::Manifest {
                    package: package_name.clone(),
                    source,
                },
            })?;

        let defaults = QualifierDefaults {
            api_level,
            smallest_screen_width_dp: settings.smallest_screen_width_dp,
            screen_width_dp: settings.screen_width_dp,
        };
        let qualifiers = resolve_qualifiers(&config.qualifiers, &defaults)?;

        let configuration = DeviceConfiguration::from_qualifiers(&qualifiers.qualifiers, api_level);
        if !configuration.gated_out.is_empty() {
            tracing::debug!(
                api_level = %api_level,
                gated_out = ?configuration.gated_out,
                "qualifiers not applied at this API level"
            );
        }
        let display_metrics = DisplayMetrics::for_configuration(&configuration);

        let main_scheduler = self.loopers.prepare_main_looper(&settings.main_thread)?;
        if settings.start_paused {
            main_scheduler.pause();
        }

        resources
            .system
            .update_configuration(&configuration, &display_metrics)
            .map_err(|source| EnvError::ResourceContext {
                context: "system",
                source,
            })?;

        let application = self
            .factory
            .create_application(test, manifest, config)
            .map_err(|source| EnvError::ApplicationConstruction {
                test: test.clone(),
                source,
            })?;

        if let Some(application) = &application {
            self.start_application(
                application,
                ApplicationContext {
                    package_name: package_name.clone(),
                    data_dir: temp_dir.path().to_path_buf(),
                    main_scheduler: main_scheduler.clone(),
                    configuration: configuration.clone(),
                    display_metrics,
                    resources: Arc::clone(&resources.application),
                },
            )?;
        }

        Ok(SimulatedEnvironment {
            test: test.clone(),
            api_level,
            qualifiers,
            configuration,
            display_metrics,
            resources,
            package_name,
            framework_artifact,
            main_thread: settings.main_thread.clone(),
            main_scheduler,
            application,
            temp_dir,
        })
    }

    fn start_application(
        &self,
        application: &Arc<dyn Application>,
        context: ApplicationContext,
    ) -> Result<(), EnvError> {
        let real_type = application.real_type();
        let object: ObjectRef = Arc::clone(application) as ObjectRef;

        match self.binder.bind(&object) {
            Ok(_) => {}
            Err(ShadowError::UnshadowedType { .. }) => {
                tracing::warn!(
                    real_type = %real_type,
                    "application type has no shadow; calls on it run the real bodies"
                );
            }
            Err(err) => return Err(err.into()),
        }

        let configuration = context.configuration.clone();
        let display_metrics = context.display_metrics;
        let resources = Arc::clone(&context.resources);
        let package_name = Value::from(context.package_name.as_str());

        self.run_hook(application, ATTACH, &[package_name], || {
            application.attach(context)
        })
        .map_err(|source| EnvError::Lifecycle {
            hook: "attach",
            real_type: real_type.clone(),
            source,
        })?;
        resources
            .update_configuration(&configuration, &display_metrics)
            .map_err(|source| EnvError::ResourceContext {
                context: "application",
                source,
            })?;
        self.run_hook(application, ON_CREATE, &[], || application.on_create())
            .map_err(|source| EnvError::Lifecycle {
                hook: "on_create",
                real_type,
                source,
            })
    }

    /// Runs a lifecycle hook through the application's shadow when the
    /// shadow overrides `signature`, otherwise runs `real`.
    fn run_hook(
        &self,
        application: &Arc<dyn Application>,
        signature: &str,
        args: &[Value],
        real: impl FnOnce() -> Result<(), InvocationError>,
    ) -> Result<(), InvocationError> {
        let method = MethodSignature::new(signature);
        let object: ObjectRef = Arc::clone(application) as ObjectRef;
        match self.binder.binding_for(&object) {
            Some(binding) if binding.descriptor().policy_for(&method) == OverridePolicy::Replace => {
                tracing::debug!(
                    real_type = %binding.real_type(),
                    hook = signature,
                    "lifecycle hook replaced by shadow"
                );
                self.binder.dispatch(&binding, &method, args).map(|_| ())
            }
            _ => real(),
        }
    }

    /// Tears the live environment down.
    ///
    /// The application's `onTerminate()` (its shadow override if there is
    /// one, else `on_terminate`) runs first; whatever it does
    /// (including panicking), every binding, scheduler and the environment
    /// are reset afterwards and the universe ends torn down. Calling this
    /// with nothing live only resets.
    ///
    /// # Errors
    ///
    /// [`EnvError::TeardownHook`] if the terminate hook failed or panicked.
    pub fn tear_down(&mut self) -> Result<(), EnvError> {
        let application = self
            .environment
            .as_ref()
            .and_then(|environment| environment.application.clone());

        let hook_failure = application.and_then(|application| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_hook(&application, ON_TERMINATE, &[], || application.on_terminate())
            }));
            let error = match outcome {
                Ok(Ok(())) => return None,
                Ok(Err(error)) => error,
                Err(payload) => InvocationError::thrown("panic", panic_message(payload.as_ref())),
            };
            Some(EnvError::TeardownHook {
                real_type: application.real_type(),
                source: error,
            })
        });

        let test = self.environment.as_ref().map(|env| env.test.clone());
        self.reset_state();
        self.phase = Phase::TornDown;

        match hook_failure {
            Some(err) => {
                tracing::warn!(error = %err, "on_terminate failed; environment was still reset");
                Err(err)
            }
            None => {
                if let Some(test) = test {
                    tracing::info!(test = %test, "environment torn down");
                }
                Ok(())
            }
        }
    }

    /// Releases every piece of per-test state.
    fn reset_state(&mut self) {
        self.binder.clear();
        self.loopers.reset();

        if let Some(environment) = self.environment.take() {
            let SimulatedEnvironment {
                test, temp_dir, ..
            } = environment;
            match temp_dir.release(self.settings.keep_temp_dirs) {
                Ok(Some(kept)) => {
                    tracing::info!(test = %test, path = %kept.display(), "kept temp directory");
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(test = %test, error = %err, "could not delete temp directory");
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        self.phase == Phase::Live
    }

    pub fn environment(&self) -> Option<&SimulatedEnvironment> {
        self.environment.as_ref()
    }

    pub fn application(&self) -> Option<Arc<dyn Application>> {
        self.environment
            .as_ref()
            .and_then(|environment| environment.application.clone())
    }

    pub fn main_scheduler(&self) -> Option<Scheduler> {
        self.environment
            .as_ref()
            .map(|environment| environment.main_scheduler.clone())
    }

    /// Virtual thread currently designated as main.
    pub fn main_thread(&self) -> Option<VirtualThreadId> {
        self.loopers.main_thread()
    }

    /// Re-designates the main virtual thread.
    pub fn set_main_thread(&self, thread: VirtualThreadId) {
        self.loopers.set_main_thread(thread);
    }

    pub fn is_main_thread(&self, thread: &VirtualThreadId) -> bool {
        self.loopers.is_main_thread(thread)
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.settings.sdk
    }

    /// Changes the simulated SDK. Takes effect at the next set-up.
    pub fn set_sdk_config(&mut self, sdk: SdkConfig) {
        self.settings.sdk = sdk;
    }

    pub fn api_level(&self) -> ApiLevel {
        self.settings.sdk.api_level
    }

    pub fn settings(&self) -> &UniverseSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ShadowRegistry> {
        &self.registry
    }

    pub fn binder(&self) -> &Arc<ShadowBinder> {
        &self.binder
    }

    pub fn loopers(&self) -> &LooperTable {
        &self.loopers
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "on_terminate panicked".to_string())
}
